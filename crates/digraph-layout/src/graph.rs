//! Directed graph model shared by every layout algorithm
//!
//! The model owns structure only: nodes, directed edges tagged with an
//! [`EdgeRole`], and the optional sibling `order` used by tree layouts.
//! Algorithm state (levels, blocks, contour modifiers) lives in side tables
//! owned by the algorithm that computes it.

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Identifier bounds required from caller-provided node ids
pub trait NodeId: Copy + Ord + Hash + fmt::Debug {}

impl<T> NodeId for T where T: Copy + Ord + Hash + fmt::Debug {}

/// A vertex of the layout graph
///
/// Besides the caller's own nodes, layouts introduce dummy nodes for long
/// edges and, for forests, a synthesized tree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vertex<N> {
    /// A node provided by the caller
    Node(N),
    /// A dummy node on a chain replacing an edge that spans several levels
    Dummy(usize),
    /// Synthesized root connecting every root of a forest
    Root,
}

impl<N> Vertex<N> {
    /// The caller's id, if this is not a synthesized vertex
    pub fn node(&self) -> Option<&N> {
        match self {
            Vertex::Node(n) => Some(n),
            Vertex::Dummy(_) | Vertex::Root => None,
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Vertex::Dummy(_))
    }
}

impl<N: fmt::Display> fmt::Display for Vertex<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Node(n) => write!(f, "{n}"),
            Vertex::Dummy(k) => write!(f, "DUMMY_NODE{k}"),
            Vertex::Root => write!(f, "DUMMY_ROOT"),
        }
    }
}

/// How an edge of a laid out graph relates to the caller's input
///
/// Rendering uses the role to style edges; the layout math only cares that
/// dummy edges take part in crossing counts like any other edge. Edges of a
/// dummy chain carry the role of the long edge they replace, so a flipped
/// long edge stays `Reversed` along its whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeRole {
    /// Edge kept in its input orientation
    #[default]
    Original,
    /// Edge flipped to break a cycle
    Reversed,
    /// Edge introduced by layout, e.g. from a synthesized root
    Dummy,
}

impl fmt::Display for EdgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeRole::Original => "original",
            EdgeRole::Reversed => "reversed",
            EdgeRole::Dummy => "dummy",
        };
        f.write_str(name)
    }
}

/// Directed graph with per-edge roles and optional sibling order
///
/// Iteration over nodes and adjacency follows insertion order, which is what
/// every deterministic tie-break in this crate is defined against.
#[derive(Debug, Clone)]
pub struct Graph<N>
where
    N: NodeId,
{
    inner: DiGraphMap<Vertex<N>, EdgeRole>,
    order: HashMap<Vertex<N>, usize>,
}

impl<N: NodeId> Default for Graph<N> {
    fn default() -> Self {
        Self {
            inner: DiGraphMap::new(),
            order: HashMap::new(),
        }
    }
}

impl<N: NodeId> Graph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(source, target)` pairs, adding nodes on first use
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (N, N)>,
    {
        let mut graph = Self::new();
        for (u, v) in edges {
            graph.add_edge(u, v);
        }
        graph
    }

    /// Add a caller node; adding an existing node is a no-op
    pub fn add_node(&mut self, node: N) -> Vertex<N> {
        self.inner.add_node(Vertex::Node(node))
    }

    /// Add an edge in its original orientation
    pub fn add_edge(&mut self, source: N, target: N) {
        self.inner
            .add_edge(Vertex::Node(source), Vertex::Node(target), EdgeRole::Original);
    }

    /// Set the sibling rank of a node, used to order children in tree layouts
    pub fn set_order(&mut self, node: N, order: usize) {
        self.add_node(node);
        self.order.insert(Vertex::Node(node), order);
    }

    pub(crate) fn add_vertex(&mut self, vertex: Vertex<N>) -> Vertex<N> {
        self.inner.add_node(vertex)
    }

    /// Insert or overwrite the edge `source -> target` with the given role
    pub(crate) fn add_edge_with_role(&mut self, source: Vertex<N>, target: Vertex<N>, role: EdgeRole) {
        self.inner.add_edge(source, target, role);
    }

    pub(crate) fn remove_edge(&mut self, source: Vertex<N>, target: Vertex<N>) -> Option<EdgeRole> {
        self.inner.remove_edge(source, target)
    }

    /// Sibling rank of a node, if one was set
    pub fn order(&self, vertex: Vertex<N>) -> Option<usize> {
        self.order.get(&vertex).copied()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn contains_node(&self, vertex: Vertex<N>) -> bool {
        self.inner.contains_node(vertex)
    }

    pub fn contains_edge(&self, source: Vertex<N>, target: Vertex<N>) -> bool {
        self.inner.contains_edge(source, target)
    }

    /// Role of the edge `source -> target`, if present
    pub fn edge_role(&self, source: Vertex<N>, target: Vertex<N>) -> Option<EdgeRole> {
        self.inner.edge_weight(source, target).copied()
    }

    /// All vertices in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = Vertex<N>> + '_ {
        self.inner.nodes()
    }

    /// All edges as `(source, target, role)`
    pub fn edges(&self) -> impl Iterator<Item = (Vertex<N>, Vertex<N>, EdgeRole)> + '_ {
        self.inner.all_edges().map(|(u, v, role)| (u, v, *role))
    }

    /// Neighbors of `vertex` in the given direction, excluding self-loops
    pub fn neighbors(&self, vertex: Vertex<N>, direction: Direction) -> impl Iterator<Item = Vertex<N>> + '_ {
        self.inner
            .neighbors_directed(vertex, direction)
            .filter(move |&n| n != vertex)
    }

    pub fn successors(&self, vertex: Vertex<N>) -> impl Iterator<Item = Vertex<N>> + '_ {
        self.neighbors(vertex, Direction::Outgoing)
    }

    pub fn predecessors(&self, vertex: Vertex<N>) -> impl Iterator<Item = Vertex<N>> + '_ {
        self.neighbors(vertex, Direction::Incoming)
    }

    /// Number of outgoing edges, self-loops excluded
    pub fn out_degree(&self, vertex: Vertex<N>) -> usize {
        self.successors(vertex).count()
    }

    /// Number of incoming edges, self-loops excluded
    pub fn in_degree(&self, vertex: Vertex<N>) -> usize {
        self.predecessors(vertex).count()
    }

    /// Vertices without outgoing edges, in insertion order
    pub fn sinks(&self) -> Vec<Vertex<N>> {
        self.nodes().filter(|&v| self.out_degree(v) == 0).collect()
    }

    /// Vertices without incoming edges, in insertion order
    pub fn sources(&self) -> Vec<Vertex<N>> {
        self.nodes().filter(|&v| self.in_degree(v) == 0).collect()
    }

    /// Remove every self-loop and return how many were removed
    pub fn remove_self_loops(&mut self) -> usize {
        let loops: Vec<_> = self
            .inner
            .all_edges()
            .filter(|(u, v, _)| u == v)
            .map(|(u, _, _)| u)
            .collect();
        for &v in &loops {
            self.inner.remove_edge(v, v);
        }
        loops.len()
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.inner)
    }

    /// Successors of `vertex` sorted by sibling order
    ///
    /// Children without an explicit order keep their edge insertion order and
    /// come after the ordered ones.
    pub fn children(&self, vertex: Vertex<N>) -> Vec<Vertex<N>> {
        let mut children: Vec<_> = self.successors(vertex).collect();
        children.sort_by_key(|&c| self.order(c).unwrap_or(usize::MAX));
        children
    }
}
