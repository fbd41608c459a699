use crate::graph::Vertex;
use crate::layered::BlockId;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while computing a layout
///
/// Every error is fatal to the layout invocation that produced it; no partial
/// result is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError<N>
where
    N: fmt::Debug,
{
    /// Layering was asked to process a graph that still contains a cycle
    #[error("graph contains a cycle through node {0:?}, break cycles before layering")]
    AcyclicityViolation(Vertex<N>),

    /// The reciprocal neighbor index of a block does not match its neighbor
    #[error("adjacency index of block {block} is inconsistent for neighbor {node:?}")]
    IndexInvariantViolation { block: BlockId, node: Vertex<N> },

    /// A vertex was looked up that has no level or block assigned
    #[error("node {0:?} has not been assigned to a layer")]
    UnlayeredNode(Vertex<N>),

    /// Every node has a predecessor, so no tree root can be chosen
    #[error("graph has no node without predecessors to use as tree root")]
    MissingRoot,
}
