use super::blocks::{BlockId, BlockList};
use super::layers::Layering;
use crate::error::LayoutError;
use crate::graph::NodeId;
use petgraph::Direction;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Minimize edge crossings by global sifting
///
/// Each round visits every block once, in the order the blocks had at the
/// start of the round, and relocates it to its locally best position. The
/// number of rounds is fixed; there is no convergence check.
pub fn global_sifting<N: NodeId>(
    layering: &Layering<N>,
    mut blocks: BlockList<N>,
    rounds: usize,
) -> Result<BlockList<N>, LayoutError<N>> {
    for round in 0..rounds {
        let visit: Vec<BlockId> = blocks.order().to_vec();
        for a in visit {
            blocks = sifting_step(layering, &blocks, a)?;
        }
        debug!(round, blocks = blocks.len(), "Sifting round done");
    }
    Ok(blocks)
}

/// Relocate block `a` to the position with the fewest crossings
///
/// Works on a clone of `blocks`: `a` is moved to the far left, then swapped
/// past each right-hand neighbor in turn while the running crossing delta is
/// tracked. The earliest position with the strictly smallest delta wins, and
/// the clone with `a` placed there is returned as the new state.
pub fn sifting_step<N: NodeId>(
    layering: &Layering<N>,
    blocks: &BlockList<N>,
    a: BlockId,
) -> Result<BlockList<N>, LayoutError<N>> {
    let mut trial = blocks.clone();
    trial.move_to(a, 0);
    trial.sort_adjacencies(layering)?;

    let mut x = 0i64;
    let mut x_best = 0i64;
    let mut p_best = 0;

    for p in 1..trial.len() {
        let b = trial.order()[p];
        x += sifting_swap(layering, &mut trial, a, b)?;
        if x < x_best {
            x_best = x;
            p_best = p;
        }
    }

    trace!(block = a, position = p_best, delta = x_best, "Sifted block");
    trial.move_to(a, p_best);

    if cfg!(debug_assertions) {
        trial.check_adjacencies(layering)?;
    }
    Ok(trial)
}

/// Swap block `a` with its right-hand neighbor `b` and return the change in
/// crossings
///
/// Only levels where one block has an end (upper node for `Incoming`, lower
/// node for `Outgoing`) and the other block is present can change crossings.
/// On such a level a block that is only passing through contributes its own
/// chain continuation as single neighbor. After counting, the neighbor index
/// entries of nodes adjacent to both blocks are swapped so the arrays stay
/// sorted and reciprocal.
pub fn sifting_swap<N: NodeId>(
    layering: &Layering<N>,
    blocks: &mut BlockList<N>,
    a: BlockId,
    b: BlockId,
) -> Result<i64, LayoutError<N>> {
    // At most one side per direction survives: block levels are consecutive,
    // so two distinct end levels can't each lie inside the other block
    let mut sides: Vec<(usize, Direction)> = Vec::with_capacity(2);
    {
        let (block_a, block_b) = (blocks.block(a), blocks.block(b));
        for direction in [Direction::Incoming, Direction::Outgoing] {
            for (end, other) in [(block_a, block_b), (block_b, block_a)] {
                let side = (end.end_level(direction), direction);
                if other.spans(side.0) && !sides.contains(&side) {
                    sides.push(side);
                }
            }
        }
    }

    let mut delta = 0;
    for (level, direction) in sides {
        let a_ends = blocks.block(a).end_level(direction) == level;
        let b_ends = blocks.block(b).end_level(direction) == level;

        let left = neighbor_positions(layering, blocks, a, direction, a_ends)?;
        let right = neighbor_positions(layering, blocks, b, direction, b_ends)?;
        delta += uswap(&left, &right);

        if a_ends && b_ends {
            update_adjacencies(layering, blocks, a, b, direction, &left, &right)?;
        }
    }

    blocks.swap_positions(a, b);
    Ok(delta)
}

/// Positions of the blocks adjacent to `id` on one side of a level
///
/// A block without an end on that level continues vertically, so its only
/// neighbor is itself.
fn neighbor_positions<N: NodeId>(
    layering: &Layering<N>,
    blocks: &BlockList<N>,
    id: BlockId,
    direction: Direction,
    ends: bool,
) -> Result<Vec<usize>, LayoutError<N>> {
    if !ends {
        return Ok(vec![blocks.pi(id)]);
    }
    blocks
        .block(id)
        .neighbors(direction)
        .iter()
        .map(|&v| Ok(blocks.pi(layering.block_of(v)?)))
        .collect()
}

/// Crossing delta of swapping two adjacent blocks, by merging their sorted
/// neighbor positions
///
/// Counts neighbor pairs ranked left-before-right (crossings gained) minus
/// pairs ranked right-before-left (crossings lost). A shared neighbor never
/// crosses itself, so on a tie only the strictly later entries of each side
/// are counted.
fn uswap(left: &[usize], right: &[usize]) -> i64 {
    let (r, s) = (left.len() as i64, right.len() as i64);
    let (mut i, mut j, mut c) = (0usize, 0usize, 0i64);

    while i < left.len() && j < right.len() {
        if left[i] < right[j] {
            c += s - j as i64;
            i += 1;
        } else if left[i] > right[j] {
            c -= r - i as i64;
            j += 1;
        } else {
            c += (s - j as i64) - (r - i as i64);
            i += 1;
            j += 1;
        }
    }
    c
}

/// Reorder the entries of `a` and `b` in every neighbor they share
fn update_adjacencies<N: NodeId>(
    layering: &Layering<N>,
    blocks: &mut BlockList<N>,
    a: BlockId,
    b: BlockId,
    direction: Direction,
    left: &[usize],
    right: &[usize],
) -> Result<(), LayoutError<N>> {
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if left[i] < right[j] {
            i += 1;
        } else if left[i] > right[j] {
            j += 1;
        } else {
            let neighbor = layering.block_of(blocks.block(a).neighbors(direction)[i])?;
            blocks.swap_shared_neighbor(neighbor, a, b, direction, i, j)?;
            i += 1;
            j += 1;
        }
    }
    Ok(())
}

/// Count pairwise edge crossings between consecutive levels
///
/// Every edge of a layering spans one level, so two edges can only cross
/// when they leave the same level. Edges sharing an endpoint never cross.
pub fn count_crossings<N: NodeId>(
    layering: &Layering<N>,
    blocks: &BlockList<N>,
) -> Result<usize, LayoutError<N>> {
    let mut by_level: HashMap<usize, Vec<(usize, usize)>> = HashMap::new();
    for (u, v, _) in layering.graph().edges() {
        let pu = blocks.pi(layering.block_of(u)?);
        let pv = blocks.pi(layering.block_of(v)?);
        by_level.entry(layering.level(u)?).or_default().push((pu, pv));
    }

    let mut crossings = 0;
    for edges in by_level.values() {
        for (k, &(u1, v1)) in edges.iter().enumerate() {
            for &(u2, v2) in &edges[k + 1..] {
                if (u1 < u2 && v1 > v2) || (u1 > u2 && v1 < v2) {
                    crossings += 1;
                }
            }
        }
    }
    Ok(crossings)
}
