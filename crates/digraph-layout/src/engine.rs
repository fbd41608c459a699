use crate::error::LayoutError;
use crate::graph::{Graph, NodeId, Vertex};
use crate::Point;
use std::collections::HashMap;

/// A layout engine that can compute positions for graph nodes
///
/// Implemented by the layered layout, which positions every vertex of the
/// layered graph including dummies, and by the tree layout, which positions
/// the caller's nodes reachable from the root.
pub trait LayoutEngine<N: NodeId> {
    /// Compute vertex positions for the given graph
    ///
    /// # Errors
    /// Returns an error if the layout computation fails, e.g. a tree layout
    /// of a graph where every node has a predecessor.
    fn layout(&self, graph: &Graph<N>) -> Result<HashMap<Vertex<N>, Point>, LayoutError<N>>;
}
