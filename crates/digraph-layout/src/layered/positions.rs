use super::blocks::BlockList;
use super::layers::Layering;
use crate::error::LayoutError;
use crate::graph::{NodeId, Vertex};
use crate::{Point, Vec2};
use std::collections::HashMap;

/// Grid cell of a vertex: its level and the position of its block
pub(crate) fn grid_cell<N: NodeId>(
    layering: &Layering<N>,
    blocks: &BlockList<N>,
    vertex: Vertex<N>,
) -> Result<(usize, usize), LayoutError<N>> {
    let layer = layering
        .layer(vertex)
        .ok_or(LayoutError::UnlayeredNode(vertex))?;
    Ok((layer.level, blocks.pi(layer.block)))
}

/// Assign coordinates to every layered vertex
///
/// The horizontal coordinate is the block position and the vertical one the
/// negated level, both scaled by `spacing`. Dummy vertices are included so
/// that long edges can be drawn through them.
pub(crate) fn assign_coordinates<N: NodeId>(
    layering: &Layering<N>,
    blocks: &BlockList<N>,
    spacing: Vec2,
) -> HashMap<Vertex<N>, Point> {
    layering
        .iter()
        .map(|(vertex, layer)| {
            let x = blocks.pi(layer.block) as f64 * spacing.x;
            let y = -(layer.level as f64) * spacing.y;
            (vertex, Point::new(x, y))
        })
        .collect()
}
