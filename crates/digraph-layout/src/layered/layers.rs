use super::blocks::{BlockId, BlockList};
use crate::error::LayoutError;
use crate::graph::{EdgeRole, Graph, NodeId, Vertex};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Layer assignment of one vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayer {
    /// Level, increasing toward the sinks
    pub level: usize,
    /// Block the vertex belongs to
    pub block: BlockId,
    /// Whether the vertex is a dummy on a long-edge chain
    pub dummy: bool,
}

/// Issues fresh dummy vertices
///
/// Threaded explicitly through layering so that dummy names are unique per
/// counter rather than per process.
#[derive(Debug, Default)]
pub struct DummyCounter {
    next: usize,
}

impl DummyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a dummy vertex that was never issued by this counter
    pub fn next_vertex<N>(&mut self) -> Vertex<N> {
        let vertex = Vertex::Dummy(self.next);
        self.next += 1;
        vertex
    }

    /// Number of dummies issued so far
    pub fn issued(&self) -> usize {
        self.next
    }
}

/// A proper layered graph: every edge spans exactly one level
#[derive(Debug, Clone)]
pub struct Layering<N>
where
    N: NodeId,
{
    graph: Graph<N>,
    nodes: HashMap<Vertex<N>, NodeLayer>,
}

impl<N: NodeId> Layering<N> {
    /// The layered graph, including dummy chains
    pub fn graph(&self) -> &Graph<N> {
        &self.graph
    }

    pub fn layer(&self, vertex: Vertex<N>) -> Option<&NodeLayer> {
        self.nodes.get(&vertex)
    }

    pub fn level(&self, vertex: Vertex<N>) -> Result<usize, LayoutError<N>> {
        self.layer(vertex)
            .map(|l| l.level)
            .ok_or(LayoutError::UnlayeredNode(vertex))
    }

    pub fn block_of(&self, vertex: Vertex<N>) -> Result<BlockId, LayoutError<N>> {
        self.layer(vertex)
            .map(|l| l.block)
            .ok_or(LayoutError::UnlayeredNode(vertex))
    }

    /// All layered vertices with their assignment, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (Vertex<N>, &NodeLayer)> + '_ {
        self.nodes.iter().map(|(&v, l)| (v, l))
    }

    pub fn dummy_count(&self) -> usize {
        self.nodes.values().filter(|l| l.dummy).count()
    }
}

/// Assign levels by longest path to a sink and split long edges
///
/// Sinks share the sentinel level `n` (the node count); every other node sits
/// one level above its closest-level successor. Edges that would span more
/// than one level are replaced by a chain of dummies registered as a single
/// block. The returned block list already has sorted, index-consistent
/// adjacencies.
///
/// Chain edges keep the role of the edge they replace; they are recognized as
/// part of a chain by their dummy endpoint.
///
/// # Errors
/// Returns [`LayoutError::AcyclicityViolation`] if the graph contains a cycle,
/// self-loops included. The worklist gives up once a full rotation makes no
/// progress, so cyclic input is rejected instead of looping.
pub fn longest_path_layering<N: NodeId>(
    graph: Graph<N>,
    dummies: &mut DummyCounter,
) -> Result<(Layering<N>, BlockList<N>), LayoutError<N>> {
    if let Some((node, _, _)) = graph.edges().find(|(u, v, _)| u == v) {
        return Err(LayoutError::AcyclicityViolation(node));
    }

    let sentinel = graph.node_count();
    let mut layering = Layering {
        nodes: HashMap::with_capacity(sentinel),
        graph,
    };
    let mut blocks = BlockList::default();

    for sink in layering.graph.sinks() {
        let block = blocks.add_block(vec![sink], vec![sentinel]);
        layering.nodes.insert(
            sink,
            NodeLayer {
                level: sentinel,
                block,
                dummy: false,
            },
        );
    }

    let mut pending: VecDeque<Vertex<N>> = layering
        .graph
        .nodes()
        .filter(|v| !layering.nodes.contains_key(v))
        .collect();
    let mut stalled = 0;

    while let Some(node) = pending.pop_back() {
        let successors: Vec<_> = layering.graph.successors(node).collect();
        let successor_levels: Option<Vec<usize>> = successors
            .iter()
            .map(|s| layering.nodes.get(s).map(|l| l.level))
            .collect();

        let Some(level) = successor_levels.and_then(|levels| levels.into_iter().min()) else {
            // Not every successor is placed yet, retry after the others
            pending.push_front(node);
            stalled += 1;
            if stalled >= pending.len() {
                return Err(LayoutError::AcyclicityViolation(node));
            }
            continue;
        };
        stalled = 0;

        let level = level.saturating_sub(1);
        for successor in successors {
            let successor_level = layering.nodes[&successor].level;
            if successor_level - level > 1 {
                insert_dummy_chain(&mut layering, &mut blocks, dummies, (node, level), (successor, successor_level));
            }
        }

        let block = blocks.add_block(vec![node], vec![level]);
        layering.nodes.insert(
            node,
            NodeLayer {
                level,
                block,
                dummy: false,
            },
        );
    }

    debug!(
        nodes = sentinel,
        dummies = layering.dummy_count(),
        blocks = blocks.len(),
        "Longest path layering done"
    );

    blocks.sort_adjacencies(&layering)?;
    Ok((layering, blocks))
}

/// Replace `u -> v` by a dummy chain covering the levels strictly between them
fn insert_dummy_chain<N: NodeId>(
    layering: &mut Layering<N>,
    blocks: &mut BlockList<N>,
    dummies: &mut DummyCounter,
    (u, level_u): (Vertex<N>, usize),
    (v, level_v): (Vertex<N>, usize),
) {
    let role = layering.graph.remove_edge(u, v).unwrap_or_default();

    let block = blocks.next_id();
    let mut chain = Vec::with_capacity(level_v - level_u - 1);
    let mut levels = Vec::with_capacity(level_v - level_u - 1);
    let mut last = u;

    for level in level_u + 1..level_v {
        let dummy = layering.graph.add_vertex(dummies.next_vertex());
        layering.nodes.insert(
            dummy,
            NodeLayer {
                level,
                block,
                dummy: true,
            },
        );
        layering.graph.add_edge_with_role(last, dummy, role);
        chain.push(dummy);
        levels.push(level);
        last = dummy;
    }
    layering.graph.add_edge_with_role(last, v, role);

    blocks.add_block(chain, levels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn v(n: u32) -> Vertex<u32> {
        Vertex::Node(n)
    }

    #[test]
    fn test_every_edge_spans_one_level() {
        let graph = Graph::from_edges([(1, 2), (2, 3), (3, 4), (1, 4), (1, 3), (5, 4)]);
        let (layering, blocks) = longest_path_layering(graph, &mut DummyCounter::new()).unwrap();

        for (u, w, _) in layering.graph().edges() {
            assert_eq!(layering.level(w).unwrap(), layering.level(u).unwrap() + 1, "{u:?} -> {w:?}");
        }
        assert_eq!(layering.level(v(4)).unwrap(), 5);
        assert_eq!(layering.level(v(1)).unwrap(), 2);
        assert_eq!(layering.level(v(5)).unwrap(), 4);

        // 1 -> 4 spans three levels, 1 -> 3 spans two
        assert_eq!(layering.dummy_count(), 3);
        assert_eq!(blocks.len(), 5 + 2);
        blocks.check_adjacencies(&layering).unwrap();
    }

    #[test]
    fn test_dummy_chain_forms_one_block() {
        let graph = Graph::from_edges([(1, 2), (2, 3), (3, 4), (1, 4)]);
        let mut dummies = DummyCounter::new();
        let (layering, blocks) = longest_path_layering(graph, &mut dummies).unwrap();

        assert_eq!(dummies.issued(), 2);
        assert!(!layering.graph().contains_edge(v(1), v(4)));

        let chain = layering.block_of(Vertex::Dummy(0)).unwrap();
        assert_eq!(layering.block_of(Vertex::Dummy(1)).unwrap(), chain);

        let block = blocks.block(chain);
        assert_eq!(block.nodes(), &[Vertex::Dummy(0), Vertex::Dummy(1)]);
        assert_eq!(block.levels(), &[2, 3]);
        assert_eq!(
            layering.graph().edge_role(v(1), Vertex::Dummy(0)),
            Some(EdgeRole::Original)
        );
        assert_eq!(
            layering.graph().edge_role(Vertex::Dummy(1), v(4)),
            Some(EdgeRole::Original)
        );
    }

    #[test]
    fn test_long_reversed_edge_keeps_role() {
        let mut graph = Graph::from_edges([(1, 2), (2, 3)]);
        graph.add_edge_with_role(v(1), v(3), EdgeRole::Reversed);
        let (layering, _) = longest_path_layering(graph, &mut DummyCounter::new()).unwrap();

        let chain: Vec<_> = layering
            .graph()
            .edges()
            .filter(|(u, w, _)| u.is_dummy() || w.is_dummy())
            .collect();
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|&(_, _, role)| role == EdgeRole::Reversed));
        assert_eq!(
            layering.graph().edge_role(v(1), v(2)),
            Some(EdgeRole::Original)
        );
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let graph = Graph::from_edges([(1, 1), (1, 2)]);
        let result = longest_path_layering(graph, &mut DummyCounter::new());

        assert_eq!(result.err(), Some(LayoutError::AcyclicityViolation(v(1))));
    }

    #[test]
    fn test_isolated_nodes_are_sinks() {
        let mut graph = Graph::new();
        graph.add_node(7);
        graph.add_edge(1, 2);
        let (layering, blocks) = longest_path_layering(graph, &mut DummyCounter::new()).unwrap();

        assert_eq!(layering.level(v(7)).unwrap(), 3);
        assert_eq!(layering.level(v(2)).unwrap(), 3);
        assert_eq!(layering.level(v(1)).unwrap(), 2);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let graph = Graph::from_edges([(0, 1), (1, 2), (2, 3), (3, 1)]);
        let result = longest_path_layering(graph, &mut DummyCounter::new());

        assert!(matches!(result, Err(LayoutError::AcyclicityViolation(_))));
    }

    #[test]
    fn test_empty_graph() {
        let (layering, blocks) =
            longest_path_layering(Graph::<u32>::new(), &mut DummyCounter::new()).unwrap();

        assert_eq!(layering.iter().count(), 0);
        assert!(blocks.is_empty());
    }
}
