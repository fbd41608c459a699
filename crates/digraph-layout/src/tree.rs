//! Tidy tree layout
//!
//! Positions a rooted tree with the linear time variant of Walker's algorithm
//! (Buchheim, Jünger, Leipert). A bottom-up walk assigns preliminary x
//! coordinates and pushes colliding subtrees apart by following their
//! contours; a top-down walk sums the accumulated modifiers into final
//! positions.
//!
//! Parents are centered above their first and last child, siblings keep their
//! `order`, and isomorphic subtrees get identical shapes.

use crate::error::LayoutError;
use crate::graph::{EdgeRole, Graph, NodeId, Vertex};
use crate::layered::{greedy_cycle_removal, LayeredDrawing};
use crate::{LayoutEngine, Point};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Configuration for the tidy tree layout
#[derive(Debug, Clone)]
pub struct TreeLayout {
    /// Minimum horizontal distance between adjacent siblings
    pub node_spacing: f64,

    /// Minimum horizontal distance between neighboring subtrees
    pub subtree_spacing: f64,

    /// Vertical distance between depths
    pub level_spacing: f64,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            node_spacing: 1.0,
            subtree_spacing: 1.0,
            level_spacing: 10.0,
        }
    }
}

impl TreeLayout {
    /// Create a new tree layout with equal sibling and subtree spacing
    pub fn new(spacing: f64, level_spacing: f64) -> Self {
        Self {
            node_spacing: spacing,
            subtree_spacing: spacing,
            level_spacing,
        }
    }
}

/// Give `graph` a single root
///
/// Self-loops are removed. A graph with several nodes without predecessors
/// gets a synthesized [`Vertex::Root`] linked to each of them by dummy edges.
///
/// # Errors
/// Returns [`LayoutError::MissingRoot`] if every node has a predecessor.
pub fn as_tree<N: NodeId>(graph: &Graph<N>) -> Result<(Graph<N>, Vertex<N>), LayoutError<N>> {
    let mut tree = graph.clone();
    tree.remove_self_loops();

    match tree.sources().as_slice() {
        [] => Err(LayoutError::MissingRoot),
        [root] => Ok((tree, *root)),
        roots => {
            let roots = roots.to_vec();
            tree.add_vertex(Vertex::Root);
            for root in roots {
                tree.add_edge_with_role(Vertex::Root, root, EdgeRole::Dummy);
            }
            Ok((tree, Vertex::Root))
        }
    }
}

#[derive(Debug)]
struct WalkNode<N> {
    vertex: Vertex<N>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Index among siblings
    number: usize,
    depth: usize,
    prelim: f64,
    modifier: f64,
    shift: f64,
    change: f64,
    thread: Option<usize>,
    ancestor: usize,
}

/// Arena of the spanning tree being laid out, in preorder
struct Walker<N> {
    nodes: Vec<WalkNode<N>>,
    node_spacing: f64,
    subtree_spacing: f64,
}

impl<N: NodeId> Walker<N> {
    /// Collect the tree reachable from `root` in preorder
    ///
    /// A node with several parents is attached below the first one that
    /// reaches it; later edges into it are ignored.
    fn new(graph: &Graph<N>, root: Vertex<N>, layout: &TreeLayout) -> Self {
        let mut nodes: Vec<WalkNode<N>> = Vec::with_capacity(graph.node_count());
        let mut seen = HashSet::with_capacity(graph.node_count());
        let mut stack = vec![(root, None)];

        while let Some((vertex, parent)) = stack.pop() {
            if !seen.insert(vertex) {
                continue;
            }
            let index = nodes.len();
            let (number, depth) = match parent {
                Some(p) => {
                    let parent_node: &mut WalkNode<N> = &mut nodes[p];
                    parent_node.children.push(index);
                    (parent_node.children.len() - 1, parent_node.depth + 1)
                }
                None => (0, 0),
            };
            nodes.push(WalkNode {
                vertex,
                parent,
                children: Vec::new(),
                number,
                depth,
                prelim: 0.0,
                modifier: 0.0,
                shift: 0.0,
                change: 0.0,
                thread: None,
                ancestor: index,
            });

            for child in graph.children(vertex).into_iter().rev() {
                if !seen.contains(&child) {
                    stack.push((child, Some(index)));
                }
            }
        }

        Self {
            nodes,
            node_spacing: layout.node_spacing,
            subtree_spacing: layout.subtree_spacing,
        }
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let parent = self.nodes[v].parent?;
        let number = self.nodes[v].number;
        (number > 0).then(|| self.nodes[parent].children[number - 1])
    }

    fn leftmost_sibling(&self, v: usize) -> usize {
        match self.nodes[v].parent {
            Some(parent) => self.nodes[parent].children[0],
            None => v,
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.first().copied().or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.last().copied().or(self.nodes[v].thread)
    }

    /// Bottom-up pass assigning `prelim` and `modifier`
    ///
    /// Nodes are finished in reverse preorder, so every subtree is complete
    /// before its parent places and apportions the children in order.
    fn first_walk(&mut self) {
        for v in (0..self.nodes.len()).rev() {
            let children = self.nodes[v].children.clone();
            let Some(&first) = children.first() else {
                continue;
            };
            let mut default_ancestor = first;
            for w in children {
                self.place(w);
                default_ancestor = self.apportion(w, default_ancestor);
            }
            self.execute_shifts(v);
        }
        if !self.nodes.is_empty() {
            self.place(0);
        }
    }

    /// Set the preliminary x of `v` next to its left sibling
    fn place(&mut self, v: usize) {
        let left = self.left_sibling(v).map(|w| self.nodes[w].prelim + self.node_spacing);
        let children = &self.nodes[v].children;
        let extremes = (children.first().copied(), children.last().copied());

        match extremes {
            (Some(first), Some(last)) => {
                let midpoint = 0.5 * (self.nodes[first].prelim + self.nodes[last].prelim);
                let node = &mut self.nodes[v];
                match left {
                    Some(prelim) => {
                        node.prelim = prelim;
                        node.modifier = prelim - midpoint;
                    }
                    None => node.prelim = midpoint,
                }
            }
            _ => self.nodes[v].prelim = left.unwrap_or(0.0),
        }
    }

    /// Push the subtree of `v` clear of its left siblings' subtrees
    ///
    /// Walks the inner contours (right contour of the left forest, left
    /// contour of `v`) and the outer contours in lockstep, with modifier sums
    /// `s*` along each. Threads are attached where one contour ends before the
    /// other.
    fn apportion(&mut self, v: usize, default_ancestor: usize) -> usize {
        let Some(left) = self.left_sibling(v) else {
            return default_ancestor;
        };
        let mut default_ancestor = default_ancestor;

        let (mut vip, mut vop) = (v, v);
        let mut vin = left;
        let mut von = self.leftmost_sibling(v);
        let mut sip = self.nodes[vip].modifier;
        let mut sop = self.nodes[vop].modifier;
        let mut sin = self.nodes[vin].modifier;
        let mut son = self.nodes[von].modifier;

        loop {
            let (Some(nr), Some(nl)) = (self.next_right(vin), self.next_left(vip)) else {
                break;
            };
            let (Some(ol), Some(or)) = (self.next_left(von), self.next_right(vop)) else {
                break;
            };
            vin = nr;
            vip = nl;
            von = ol;
            vop = or;
            self.nodes[vop].ancestor = v;

            let shift = (self.nodes[vin].prelim + sin) - (self.nodes[vip].prelim + sip) + self.subtree_spacing;
            if shift > 0.0 {
                let wm = self.ancestor(vin, v, default_ancestor);
                self.move_subtree(wm, v, shift);
                sip += shift;
                sop += shift;
            }

            sin += self.nodes[vin].modifier;
            sip += self.nodes[vip].modifier;
            son += self.nodes[von].modifier;
            sop += self.nodes[vop].modifier;
        }

        if let Some(nr) = self.next_right(vin) {
            if self.next_right(vop).is_none() {
                self.nodes[vop].thread = Some(nr);
                self.nodes[vop].modifier += sin - sop;
            }
        }
        if let Some(nl) = self.next_left(vip) {
            if self.next_left(von).is_none() {
                self.nodes[von].thread = Some(nl);
                self.nodes[von].modifier += sip - son;
                default_ancestor = v;
            }
        }
        default_ancestor
    }

    /// The sibling of `v` whose subtree holds `vin`, or the default ancestor
    fn ancestor(&self, vin: usize, v: usize, default_ancestor: usize) -> usize {
        let candidate = self.nodes[vin].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            default_ancestor
        }
    }

    /// Shift the subtree of `wp` right by `shift`
    ///
    /// The siblings strictly between `wm` and `wp` are spread evenly later by
    /// [`Walker::execute_shifts`].
    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let subtrees = (self.nodes[wp].number - self.nodes[wm].number) as f64;
        let per_subtree = shift / subtrees;

        self.nodes[wp].change -= per_subtree;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += per_subtree;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for k in (0..self.nodes[v].children.len()).rev() {
            let w = self.nodes[v].children[k];
            let child = &mut self.nodes[w];
            child.prelim += shift;
            child.modifier += shift;
            change += child.change;
            shift += child.shift + change;
        }
    }

    /// Top-down pass summing modifiers into final coordinates
    ///
    /// The root lands on x = 0.
    fn second_walk(&self, level_spacing: f64) -> HashMap<Vertex<N>, Point> {
        let mut positions = HashMap::with_capacity(self.nodes.len());
        let Some(root) = self.nodes.first() else {
            return positions;
        };
        let mut stack = vec![(0, -root.prelim)];

        while let Some((v, m)) = stack.pop() {
            let node = &self.nodes[v];
            let y = -(node.depth as f64) * level_spacing;
            positions.insert(node.vertex, Point::new(node.prelim + m, y));
            for &child in &node.children {
                stack.push((child, m + node.modifier));
            }
        }
        positions
    }
}

impl TreeLayout {
    /// Lay out the tree spanned from the root of `graph`
    ///
    /// The result includes a synthesized [`Vertex::Root`] if `graph` has
    /// several roots. Nodes not reachable from the root are left out.
    ///
    /// # Errors
    /// Returns [`LayoutError::MissingRoot`] if every node has a predecessor.
    pub fn layout_tree<N: NodeId>(&self, graph: &Graph<N>) -> Result<HashMap<Vertex<N>, Point>, LayoutError<N>> {
        if graph.is_empty() {
            return Ok(HashMap::new());
        }

        let (tree, root) = as_tree(graph)?;
        let mut walker = Walker::new(&tree, root, self);

        let unreachable = tree.node_count() - walker.nodes.len();
        if unreachable > 0 {
            warn!(unreachable, root = ?root, "Nodes not reachable from the tree root are not laid out");
        }

        walker.first_walk();
        let positions = walker.second_walk(self.level_spacing);
        debug!(nodes = positions.len(), root = ?root, "Tree layout done");
        Ok(positions)
    }
}

impl TreeLayout {
    /// Spread a layered drawing like a tree
    ///
    /// The x coordinate comes from a tree layout of the layered graph, dummy
    /// chains included; y is the negated level scaled by `level_spacing`.
    ///
    /// # Errors
    /// Only returns an error if a laid out vertex has no level.
    pub fn layout_layers<N: NodeId>(
        &self,
        drawing: &LayeredDrawing<N>,
    ) -> Result<HashMap<Vertex<N>, Point>, LayoutError<N>> {
        let mut positions = self.layout_tree(drawing.layering().graph())?;
        positions.remove(&Vertex::Root);
        for (&vertex, point) in positions.iter_mut() {
            point.y = -(drawing.level(vertex)? as f64) * self.level_spacing;
        }
        Ok(positions)
    }
}

impl<N: NodeId> LayoutEngine<N> for TreeLayout {
    fn layout(&self, graph: &Graph<N>) -> Result<HashMap<Vertex<N>, Point>, LayoutError<N>> {
        let acyclic = greedy_cycle_removal(graph);
        let mut positions = self.layout_tree(&acyclic)?;
        positions.remove(&Vertex::Root);
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_log::test;

    const EPSILON: f64 = 1e-9;

    fn v(n: &'static str) -> Vertex<&'static str> {
        Vertex::Node(n)
    }

    fn x(positions: &HashMap<Vertex<&'static str>, Point>, n: &'static str) -> f64 {
        positions[&v(n)].x
    }

    #[test]
    fn test_seven_node_tree() {
        let graph = Graph::from_edges([
            ("r", "a"),
            ("r", "b"),
            ("r", "c"),
            ("a", "d"),
            ("a", "e"),
            ("b", "f"),
        ]);
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();

        let expected = [
            ("r", 0.0, 0.0),
            ("a", -1.25, -10.0),
            ("b", 0.25, -10.0),
            ("c", 1.25, -10.0),
            ("d", -1.75, -20.0),
            ("e", -0.75, -20.0),
            ("f", 0.25, -20.0),
        ];
        assert_eq!(positions.len(), expected.len());
        for (node, ex, ey) in expected {
            let p = positions[&v(node)];
            assert!((p.x - ex).abs() < EPSILON, "{node}: x = {}, expected {ex}", p.x);
            assert_eq!(p.y, ey, "{node}");
        }

        assert!(x(&positions, "a") < x(&positions, "b") && x(&positions, "b") < x(&positions, "c"));
        let midpoint = 0.5 * (x(&positions, "a") + x(&positions, "c"));
        assert!((x(&positions, "r") - midpoint).abs() < EPSILON);
    }

    #[test]
    fn test_isomorphic_subtrees_are_translations() {
        let graph = Graph::from_edges([
            ("r", "a"),
            ("r", "m"),
            ("r", "b"),
            ("a", "a1"),
            ("a", "a2"),
            ("a2", "a3"),
            ("m", "m1"),
            ("m1", "m2"),
            ("m1", "m3"),
            ("b", "b1"),
            ("b", "b2"),
            ("b2", "b3"),
            // same shape again, two levels deeper below another parent
            ("m2", "c"),
            ("c", "c1"),
            ("c", "c2"),
            ("c2", "c3"),
        ]);
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();

        let offset = |node, root| {
            let (p, r) = (positions[&v(node)], positions[&v(root)]);
            (p.x - r.x, p.y - r.y)
        };
        for (a, b, c) in [("a1", "b1", "c1"), ("a2", "b2", "c2"), ("a3", "b3", "c3")] {
            let (ax, ay) = offset(a, "a");
            for (other, root) in [(b, "b"), (c, "c")] {
                let (ox, oy) = offset(other, root);
                assert!((ax - ox).abs() < EPSILON, "{a} vs {other}");
                assert_eq!(ay, oy, "{a} vs {other}");
            }
        }
        assert_eq!(positions[&v("c")].y, -40.0);
    }

    #[test]
    fn test_children_follow_order() {
        let mut graph = Graph::from_edges([("r", "x"), ("r", "y"), ("r", "z")]);
        graph.set_order("z", 0);
        graph.set_order("y", 1);
        graph.set_order("x", 2);
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();

        assert!(x(&positions, "z") < x(&positions, "y"));
        assert!(x(&positions, "y") < x(&positions, "x"));
    }

    #[test]
    fn test_forest_gets_synthesized_root() {
        let graph = Graph::from_edges([("a", "b"), ("c", "d")]);
        let layout = TreeLayout::default();

        let positions = layout.layout_tree(&graph).unwrap();
        assert_eq!(positions[&Vertex::Root], Point::new(0.0, 0.0));
        assert_eq!(positions[&v("a")].y, -10.0);
        assert_eq!(positions[&v("d")].y, -20.0);
        assert!(x(&positions, "a") < x(&positions, "c"));

        let positions = layout.layout(&graph).unwrap();
        assert_eq!(positions.len(), 4);
        assert!(!positions.contains_key(&Vertex::Root));
    }

    #[test]
    fn test_cycle_without_root() {
        let graph = Graph::from_edges([("a", "b"), ("b", "a")]);
        let layout = TreeLayout::default();

        assert_eq!(layout.layout_tree(&graph), Err(LayoutError::MissingRoot));
        // the engine breaks the cycle first
        assert_eq!(layout.layout(&graph).unwrap().len(), 2);
    }

    #[test]
    fn test_shared_child_is_placed_once() {
        let graph = Graph::from_edges([("r", "a"), ("r", "b"), ("a", "c"), ("b", "c")]);
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();

        assert_eq!(positions.len(), 4);
        assert_eq!(positions[&v("c")].x, positions[&v("a")].x);
    }

    #[test]
    fn test_unreachable_nodes_are_skipped() {
        let graph = Graph::from_edges([("r", "a"), ("x", "y"), ("y", "x")]);
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();

        assert_eq!(positions.len(), 2);
        assert!(!positions.contains_key(&v("x")));
    }

    #[test]
    fn test_single_node_and_empty_graph() {
        let mut graph = Graph::new();
        graph.add_node("solo");
        let positions = TreeLayout::default().layout_tree(&graph).unwrap();
        assert_eq!(positions[&v("solo")], Point::new(0.0, 0.0));

        let positions = TreeLayout::default().layout(&Graph::<u32>::new()).unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_layers_keep_levels() {
        let graph = Graph::from_edges([("a", "b"), ("b", "c"), ("a", "c"), ("d", "c")]);
        let drawing = crate::SiftingLayout::new(0).compute_layers(&graph).unwrap();
        let positions = TreeLayout::default().layout_layers(&drawing).unwrap();

        // four nodes plus the dummy on a -> c
        assert_eq!(positions.len(), 5);
        assert!(!positions.contains_key(&Vertex::Root));
        for (u, w, _) in drawing.edges() {
            assert_eq!(positions[&u].y - positions[&w].y, 10.0, "{u:?} -> {w:?}");
        }
    }

    /// Children lists of a random tree where node `i` hangs below `parents[i - 1]`
    fn random_tree(parents: &[prop::sample::Index]) -> Graph<usize> {
        let mut graph = Graph::new();
        graph.add_node(0);
        for (i, parent) in parents.iter().enumerate() {
            graph.add_edge(parent.index(i + 1), i + 1);
        }
        graph
    }

    fn depth_rows(graph: &Graph<usize>) -> Vec<Vec<Vertex<usize>>> {
        let mut rows: Vec<Vec<Vertex<usize>>> = Vec::new();
        let mut stack = vec![(Vertex::Node(0), 0)];
        while let Some((vertex, depth)) = stack.pop() {
            if rows.len() <= depth {
                rows.push(Vec::new());
            }
            rows[depth].push(vertex);
            for child in graph.children(vertex).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        rows
    }

    proptest! {
        #[test]
        fn random_trees_do_not_overlap(parents in prop::collection::vec(any::<prop::sample::Index>(), 0..60)) {
            let graph = random_tree(&parents);
            let positions = TreeLayout::default().layout_tree(&graph).unwrap();
            prop_assert_eq!(positions.len(), parents.len() + 1);

            for row in depth_rows(&graph) {
                for pair in row.windows(2) {
                    let gap = positions[&pair[1]].x - positions[&pair[0]].x;
                    prop_assert!(gap >= 1.0 - EPSILON, "{:?} and {:?} are {} apart", pair[0], pair[1], gap);
                }
            }

            for vertex in graph.nodes() {
                let children = graph.children(vertex);
                if let (Some(first), Some(last)) = (children.first(), children.last()) {
                    let midpoint = 0.5 * (positions[first].x + positions[last].x);
                    prop_assert!((positions[&vertex].x - midpoint).abs() < 1e-6);
                }
            }
        }
    }
}
