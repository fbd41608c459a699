use crate::graph::{EdgeRole, Graph, NodeId, Vertex};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Remaining subgraph while the greedy order is being peeled
///
/// Vertices are addressed by insertion index, so "latest" and "earliest"
/// tie-breaks are plain integer comparisons.
struct Peeling {
    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
    out_deg: Vec<usize>,
    in_deg: Vec<usize>,
    alive: Vec<bool>,
    sinks: BTreeSet<usize>,
    sources: BTreeSet<usize>,
}

impl Peeling {
    fn new<N: NodeId>(graph: &Graph<N>, vertices: &[Vertex<N>]) -> Self {
        let index: HashMap<Vertex<N>, usize> = vertices.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let succs: Vec<Vec<usize>> = vertices
            .iter()
            .map(|&v| graph.successors(v).map(|s| index[&s]).collect())
            .collect();
        let preds: Vec<Vec<usize>> = vertices
            .iter()
            .map(|&v| graph.predecessors(v).map(|p| index[&p]).collect())
            .collect();
        let out_deg: Vec<usize> = succs.iter().map(Vec::len).collect();
        let in_deg: Vec<usize> = preds.iter().map(Vec::len).collect();

        Self {
            sinks: (0..vertices.len()).filter(|&i| out_deg[i] == 0).collect(),
            sources: (0..vertices.len()).filter(|&i| in_deg[i] == 0).collect(),
            alive: vec![true; vertices.len()],
            succs,
            preds,
            out_deg,
            in_deg,
        }
    }

    fn remove(&mut self, v: usize) {
        self.alive[v] = false;
        self.sinks.remove(&v);
        self.sources.remove(&v);

        for k in 0..self.preds[v].len() {
            let p = self.preds[v][k];
            if self.alive[p] {
                self.out_deg[p] -= 1;
                if self.out_deg[p] == 0 {
                    self.sinks.insert(p);
                }
            }
        }
        for k in 0..self.succs[v].len() {
            let s = self.succs[v][k];
            if self.alive[s] {
                self.in_deg[s] -= 1;
                if self.in_deg[s] == 0 {
                    self.sources.insert(s);
                }
            }
        }
    }

    /// Live vertex with the largest `out - in`, earliest on ties
    fn max_delta(&self) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for v in (0..self.alive.len()).filter(|&v| self.alive[v]) {
            let delta = self.out_deg[v] as i64 - self.in_deg[v] as i64;
            if best.map_or(true, |(_, d)| delta > d) {
                best = Some((v, delta));
            }
        }
        best.map(|(v, _)| v)
    }
}

/// Greedy vertex order whose backward edges form a small feedback arc set
///
/// Sinks are peeled off to the tail and sources to the head, latest inserted
/// first in both cases. When only cycles remain, the vertex with the largest
/// `out - in` degree difference moves to the head.
pub fn greedy_order<N: NodeId>(graph: &Graph<N>) -> Vec<Vertex<N>> {
    let vertices: Vec<Vertex<N>> = graph.nodes().collect();
    let mut peeling = Peeling::new(graph, &vertices);
    let mut head = Vec::with_capacity(vertices.len());
    let mut tail = Vec::new();
    let mut remaining = vertices.len();

    while remaining > 0 {
        while let Some(sink) = peeling.sinks.pop_last() {
            peeling.remove(sink);
            tail.push(sink);
            remaining -= 1;
        }
        while let Some(source) = peeling.sources.pop_last() {
            peeling.remove(source);
            head.push(source);
            remaining -= 1;
        }
        if remaining > 0 {
            if let Some(v) = peeling.max_delta() {
                peeling.remove(v);
                head.push(v);
                remaining -= 1;
            }
        }
    }

    // Sinks were pushed in removal order but belong in front of earlier ones
    head.extend(tail.into_iter().rev());
    head.into_iter().map(|i| vertices[i]).collect()
}

/// Return an acyclic copy of `graph`
///
/// Edges pointing backward in [`greedy_order`] are reversed and tagged
/// [`EdgeRole::Reversed`]; self-loops are dropped. Reversing an edge whose
/// opposite already exists leaves a single edge tagged `Reversed`.
pub fn greedy_cycle_removal<N: NodeId>(graph: &Graph<N>) -> Graph<N> {
    let mut acyclic = graph.clone();
    let loops = acyclic.remove_self_loops();

    let position: HashMap<Vertex<N>, usize> = greedy_order(&acyclic)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, i))
        .collect();

    let backward: Vec<(Vertex<N>, Vertex<N>)> = acyclic
        .edges()
        .filter(|(u, v, _)| position[u] > position[v])
        .map(|(u, v, _)| (u, v))
        .collect();
    for &(u, v) in &backward {
        acyclic.remove_edge(u, v);
        acyclic.add_edge_with_role(v, u, EdgeRole::Reversed);
    }

    debug!(
        nodes = acyclic.node_count(),
        reversed = backward.len(),
        self_loops = loops,
        "Cycles removed"
    );
    acyclic
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_log::test;

    fn v(n: u32) -> Vertex<u32> {
        Vertex::Node(n)
    }

    #[test]
    fn test_triangle_reverses_one_edge() {
        let graph = Graph::from_edges([(1, 2), (2, 3), (3, 1)]);
        assert_eq!(greedy_order(&graph), vec![v(1), v(2), v(3)]);

        let acyclic = greedy_cycle_removal(&graph);
        assert!(acyclic.is_acyclic());
        assert_eq!(acyclic.edge_count(), 3);
        assert_eq!(acyclic.edge_role(v(1), v(2)), Some(EdgeRole::Original));
        assert_eq!(acyclic.edge_role(v(2), v(3)), Some(EdgeRole::Original));
        assert_eq!(acyclic.edge_role(v(1), v(3)), Some(EdgeRole::Reversed));
        assert!(!acyclic.contains_edge(v(3), v(1)));
    }

    #[test]
    fn test_acyclic_input_is_unchanged() {
        let graph = Graph::from_edges([(1, 2), (1, 3), (2, 4), (3, 4)]);
        let acyclic = greedy_cycle_removal(&graph);

        assert_eq!(acyclic.edge_count(), 4);
        assert!(acyclic.edges().all(|(_, _, role)| role == EdgeRole::Original));
    }

    #[test]
    fn test_self_loops_are_dropped() {
        let graph = Graph::from_edges([(1, 1), (1, 2), (2, 2)]);
        let acyclic = greedy_cycle_removal(&graph);

        assert_eq!(acyclic.edge_count(), 1);
        assert!(acyclic.contains_edge(v(1), v(2)));
        // the input is left alone
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_two_cycle_merges_into_reversed_edge() {
        let graph = Graph::from_edges([(1, 2), (2, 1)]);
        let acyclic = greedy_cycle_removal(&graph);

        assert_eq!(acyclic.edge_count(), 1);
        assert!(acyclic.is_acyclic());
        assert_eq!(
            acyclic.edges().next().map(|(_, _, role)| role),
            Some(EdgeRole::Reversed)
        );
    }

    #[test]
    fn test_sinks_latest_first_at_tail() {
        // 1 is the only source, 2 and 3 are sinks; 3 is removed first and
        // 2 last, so 2 leads the tail
        let graph = Graph::from_edges([(1, 2), (1, 3)]);
        assert_eq!(greedy_order(&graph), vec![v(1), v(2), v(3)]);
    }

    proptest! {
        #[test]
        fn output_is_always_acyclic(edges in prop::collection::vec((0u8..12, 0u8..12), 0..60)) {
            let graph = Graph::from_edges(edges);
            let acyclic = greedy_cycle_removal(&graph);

            prop_assert!(acyclic.is_acyclic());
            prop_assert_eq!(acyclic.node_count(), graph.node_count());
            for (u, w, _) in graph.edges().filter(|(u, w, _)| u != w) {
                prop_assert!(acyclic.contains_edge(u, w) || acyclic.contains_edge(w, u));
            }
        }
    }
}
