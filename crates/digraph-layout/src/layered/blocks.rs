use super::layers::Layering;
use crate::error::LayoutError;
use crate::graph::{NodeId, Vertex};
use petgraph::Direction;
use std::collections::HashMap;

/// Index of a block inside its [`BlockList`]; never renumbered
pub type BlockId = usize;

/// A run of nodes on consecutive levels that moves as one unit
///
/// A block is either a single real node or the dummy chain replacing one long
/// edge. Its neighbor arrays hold the names of the nodes adjacent to the
/// block's upper node (`Incoming`) and lower node (`Outgoing`), kept sorted by
/// the position of the neighbor's block. Each entry carries the index at
/// which this block appears in the neighbor's opposite array, so that
/// `pred_names[pred_idx[i]]` style lookups never need a search.
#[derive(Debug, Clone)]
pub struct Block<N> {
    id: BlockId,
    nodes: Vec<Vertex<N>>,
    levels: Vec<usize>,
    succ_names: Vec<Vertex<N>>,
    succ_idx: Vec<usize>,
    pred_names: Vec<Vertex<N>>,
    pred_idx: Vec<usize>,
}

impl<N: NodeId> Block<N> {
    fn new(id: BlockId, nodes: Vec<Vertex<N>>, levels: Vec<usize>) -> Self {
        debug_assert!(!nodes.is_empty() && nodes.len() == levels.len());
        Self {
            id,
            nodes,
            levels,
            succ_names: Vec::new(),
            succ_idx: Vec::new(),
            pred_names: Vec::new(),
            pred_idx: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn nodes(&self) -> &[Vertex<N>] {
        &self.nodes
    }

    /// Levels spanned by the block, top to bottom and consecutive
    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn upper(&self) -> Vertex<N> {
        self.nodes[0]
    }

    pub fn lower(&self) -> Vertex<N> {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn upper_level(&self) -> usize {
        self.levels[0]
    }

    pub fn lower_level(&self) -> usize {
        self.levels[self.levels.len() - 1]
    }

    pub fn spans(&self, level: usize) -> bool {
        (self.upper_level()..=self.lower_level()).contains(&level)
    }

    /// The node whose edges leave the block in `direction`
    pub fn end(&self, direction: Direction) -> Vertex<N> {
        match direction {
            Direction::Incoming => self.upper(),
            Direction::Outgoing => self.lower(),
        }
    }

    /// Level of the node whose edges leave the block in `direction`
    pub fn end_level(&self, direction: Direction) -> usize {
        match direction {
            Direction::Incoming => self.upper_level(),
            Direction::Outgoing => self.lower_level(),
        }
    }

    /// Neighbor names on the given side, sorted by block position
    pub fn neighbors(&self, direction: Direction) -> &[Vertex<N>] {
        match direction {
            Direction::Incoming => &self.pred_names,
            Direction::Outgoing => &self.succ_names,
        }
    }

    /// Reciprocal indices matching [`Block::neighbors`] entry by entry
    pub fn indices(&self, direction: Direction) -> &[usize] {
        match direction {
            Direction::Incoming => &self.pred_idx,
            Direction::Outgoing => &self.succ_idx,
        }
    }

    fn adjacency_mut(&mut self, direction: Direction) -> (&mut Vec<Vertex<N>>, &mut Vec<usize>) {
        match direction {
            Direction::Incoming => (&mut self.pred_names, &mut self.pred_idx),
            Direction::Outgoing => (&mut self.succ_names, &mut self.succ_idx),
        }
    }

    fn clear_adjacencies(&mut self) {
        self.succ_names.clear();
        self.succ_idx.clear();
        self.pred_names.clear();
        self.pred_idx.clear();
    }
}

/// Blocks together with their horizontal permutation
///
/// Cloning a `BlockList` yields a fully independent trial state; sifting
/// relies on this to evaluate a move without touching the committed order.
#[derive(Debug, Clone)]
pub struct BlockList<N> {
    blocks: Vec<Block<N>>,
    order: Vec<BlockId>,
    positions: Vec<usize>,
}

impl<N> Default for BlockList<N> {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            order: Vec::new(),
            positions: Vec::new(),
        }
    }
}

impl<N: NodeId> BlockList<N> {
    /// Register a block at the rightmost position and return its id
    pub(crate) fn add_block(&mut self, nodes: Vec<Vertex<N>>, levels: Vec<usize>) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(Block::new(id, nodes, levels));
        self.positions.push(self.order.len());
        self.order.push(id);
        id
    }

    /// Id the next registered block will receive
    pub(crate) fn next_id(&self) -> BlockId {
        self.blocks.len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Horizontal position of a block
    pub fn pi(&self, id: BlockId) -> usize {
        self.positions[id]
    }

    pub fn block(&self, id: BlockId) -> &Block<N> {
        &self.blocks[id]
    }

    /// Block currently at position `pos`
    pub fn block_at(&self, pos: usize) -> &Block<N> {
        &self.blocks[self.order[pos]]
    }

    /// Block ids from left to right
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// Blocks from left to right
    pub fn iter(&self) -> impl Iterator<Item = &Block<N>> + '_ {
        self.order.iter().map(move |&id| &self.blocks[id])
    }

    /// Move a block so that it ends up at position `pos`
    pub fn move_to(&mut self, id: BlockId, pos: usize) {
        let from = self.positions[id];
        let to = pos.min(self.order.len() - 1);
        self.order.remove(from);
        self.order.insert(to, id);
        for p in from.min(to)..=from.max(to) {
            self.positions[self.order[p]] = p;
        }
    }

    /// Exchange the positions of two blocks
    pub fn swap_positions(&mut self, a: BlockId, b: BlockId) {
        let (pa, pb) = (self.positions[a], self.positions[b]);
        self.order.swap(pa, pb);
        self.positions[a] = pb;
        self.positions[b] = pa;
    }

    /// Rebuild every neighbor array against the current permutation
    ///
    /// Blocks are visited left to right and append themselves to their
    /// neighbors' arrays, which leaves each array sorted by position. Each
    /// edge is seen twice, once from either end; the first visit parks its
    /// index and the second wires both reciprocal indices.
    pub fn sort_adjacencies(&mut self, layering: &Layering<N>) -> Result<(), LayoutError<N>> {
        for block in &mut self.blocks {
            block.clear_adjacencies();
        }

        let graph = layering.graph();
        let mut parked: HashMap<(Vertex<N>, Vertex<N>), usize> = HashMap::new();

        for pos in 0..self.order.len() {
            let a = self.order[pos];
            for direction in [Direction::Incoming, Direction::Outgoing] {
                let end = self.blocks[a].end(direction);
                let neighbors: Vec<_> = graph.neighbors(end, direction).collect();
                for neighbor in neighbors {
                    let other = layering.block_of(neighbor)?;
                    let edge = match direction {
                        Direction::Incoming => (neighbor, end),
                        Direction::Outgoing => (end, neighbor),
                    };

                    let (names, idx) = self.blocks[other].adjacency_mut(direction.opposite());
                    let j = names.len();
                    names.push(end);
                    idx.push(usize::MAX);

                    if pos < self.positions[other] {
                        parked.insert(edge, j);
                    } else {
                        let k = parked
                            .remove(&edge)
                            .ok_or(LayoutError::IndexInvariantViolation { block: a, node: neighbor })?;
                        self.blocks[other].adjacency_mut(direction.opposite()).1[j] = k;
                        let (_, own_idx) = self.blocks[a].adjacency_mut(direction);
                        match own_idx.get_mut(k) {
                            Some(slot) => *slot = j,
                            None => return Err(LayoutError::IndexInvariantViolation { block: a, node: neighbor }),
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Verify the reciprocal index of every neighbor entry
    ///
    /// For block `A` with `neighbors(d)[i] == v` in block `B`, the entry at
    /// `A.indices(d)[i]` of `B.neighbors(-d)` must name `A`'s end node and
    /// point back to `i`.
    pub fn check_adjacencies(&self, layering: &Layering<N>) -> Result<(), LayoutError<N>> {
        for block in &self.blocks {
            for direction in [Direction::Incoming, Direction::Outgoing] {
                let names = block.neighbors(direction);
                let idx = block.indices(direction);
                let end = block.end(direction);

                for (i, (&name, &k)) in names.iter().zip(idx).enumerate() {
                    let violation = LayoutError::IndexInvariantViolation {
                        block: block.id,
                        node: name,
                    };
                    let Some(other) = self.blocks.get(layering.block_of(name)?) else {
                        return Err(violation);
                    };
                    let back_name = other.neighbors(direction.opposite()).get(k);
                    let back_idx = other.indices(direction.opposite()).get(k);
                    if back_name != Some(&end) || back_idx != Some(&i) {
                        return Err(violation);
                    }
                }

                if names.len() != idx.len() {
                    return Err(LayoutError::IndexInvariantViolation { block: block.id, node: end });
                }
            }
        }
        Ok(())
    }

    /// Swap the adjacency entries of `a` and `b` in a shared neighbor
    ///
    /// `i` and `j` locate the shared neighbor in `a`'s and `b`'s arrays on the
    /// `direction` side. In the neighbor the two entries are adjacent and
    /// trade places when `a` and `b` do.
    pub(crate) fn swap_shared_neighbor(
        &mut self,
        neighbor: BlockId,
        a: BlockId,
        b: BlockId,
        direction: Direction,
        i: usize,
        j: usize,
    ) -> Result<(), LayoutError<N>> {
        let index_a = self.blocks[a].indices(direction)[i];
        let index_b = self.blocks[b].indices(direction)[j];

        let node = self.blocks[a].end(direction);

        let (names, idx) = self.blocks[neighbor].adjacency_mut(direction.opposite());
        if index_a >= names.len() || index_b >= names.len() {
            return Err(LayoutError::IndexInvariantViolation { block: neighbor, node });
        }
        names.swap(index_a, index_b);
        idx.swap(index_a, index_b);

        self.blocks[a].adjacency_mut(direction).1[i] = index_b;
        self.blocks[b].adjacency_mut(direction).1[j] = index_a;
        Ok(())
    }
}
