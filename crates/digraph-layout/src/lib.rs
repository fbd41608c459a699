//! Layout algorithms for directed graphs
//!
//! This crate computes coordinates for the nodes of a directed graph. It does
//! no rendering: callers get positions and edge roles back and draw them
//! however they like.
//!
//! # Layout Engines
//!
//! - [`SiftingLayout`]: layered layout. Cycles are broken greedily, nodes are
//!   assigned to levels by longest path, long edges are split into dummy
//!   chains and crossings are reduced by global sifting.
//! - [`TreeLayout`]: tidy tree layout for rooted trees and forests.
//!
//! # Example
//!
//! ```
//! use digraph_layout::{Graph, LayoutEngine, SiftingLayout, TreeLayout, Vertex};
//!
//! // Create a graph
//! let graph = Graph::from_edges([("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
//!
//! // Use the LayoutEngine trait (simple, single-phase):
//! let positions = SiftingLayout::default().layout(&graph).unwrap();
//! assert!(positions[&Vertex::Node("a")].y > positions[&Vertex::Node("d")].y);
//!
//! // Or directly by calling each step for better control
//! let layout = SiftingLayout::new(10);
//! let drawing = layout.compute_layers(&graph).unwrap();
//! let positions = layout.compute_positions(&drawing);
//! assert_eq!(drawing.crossings, 0);
//!
//! // Trees are laid out with parents centered above their children
//! let tree = Graph::from_edges([("r", "x"), ("r", "y")]);
//! let positions = TreeLayout::default().layout(&tree).unwrap();
//! assert_eq!(positions[&Vertex::Node("r")].x, 0.0);
//! ```

mod engine;
mod error;
mod geometry;
mod graph;

pub mod layered;
pub mod tree;

// Re-export core types and traits
pub use engine::LayoutEngine;
pub use error::LayoutError;
pub use geometry::{Point, Vec2};
pub use graph::{EdgeRole, Graph, NodeId, Vertex};

pub use petgraph::Direction;

// Re-export layout types
pub use layered::{LayeredDrawing, SiftingLayout};
pub use tree::TreeLayout;
