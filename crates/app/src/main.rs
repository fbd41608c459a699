use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use digraph_layout::layered::SiftingLayout;
use digraph_layout::tree::TreeLayout;
use digraph_layout::{Graph, LayoutEngine, Point, Vec2, Vertex};
use tracing::debug;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    layout: Layout,
}

#[derive(ClapArgs)]
struct Input {
    /// Edges as `source:target`; a bare name adds an isolated node
    edges: Vec<String>,

    /// Sibling rank as `node=rank`, used to order children in tree layouts
    #[arg(long = "order")]
    orders: Vec<String>,
}

#[derive(Subcommand)]
enum Layout {
    /// Layered layout with global sifting crossing reduction
    Layered {
        #[command(flatten)]
        input: Input,

        /// Number of sifting rounds
        #[arg(long, default_value_t = 20)]
        rounds: usize,

        /// Horizontal distance between columns
        #[arg(long, default_value_t = 1.0)]
        dx: f64,

        /// Vertical distance between levels
        #[arg(long, default_value_t = 1.0)]
        dy: f64,
    },
    /// Tidy tree layout; cycles are broken first and a synthesized root
    /// joining several roots is not printed
    Tree {
        #[command(flatten)]
        input: Input,

        /// Horizontal distance between siblings and subtrees
        #[arg(long, default_value_t = 1.0)]
        spacing: f64,

        /// Vertical distance between depths
        #[arg(long, default_value_t = 10.0)]
        level_spacing: f64,
    },
    /// Tidy tree x coordinates over the layered graph, y from the level
    LongestPath {
        #[command(flatten)]
        input: Input,

        /// Horizontal distance between siblings and subtrees
        #[arg(long, default_value_t = 1.0)]
        spacing: f64,

        /// Vertical distance between levels
        #[arg(long, default_value_t = 1.0)]
        dy: f64,
    },
}

/// Split `source:target`, or return a single node name
fn parse_edge(arg: &str) -> Result<(&str, Option<&str>)> {
    match arg.split_once(':') {
        Some((source, target)) if !source.is_empty() && !target.is_empty() => Ok((source, Some(target))),
        Some(_) => bail!("invalid edge {arg:?}, expected source:target"),
        None if !arg.is_empty() => Ok((arg, None)),
        None => bail!("empty node name"),
    }
}

fn parse_order(arg: &str) -> Result<(&str, usize)> {
    let (node, rank) = arg
        .split_once('=')
        .with_context(|| format!("invalid order {arg:?}, expected node=rank"))?;
    let rank = rank
        .parse()
        .with_context(|| format!("invalid rank in {arg:?}"))?;
    Ok((node, rank))
}

fn build_graph(input: &Input) -> Result<Graph<&str>> {
    let mut graph = Graph::new();
    for arg in &input.edges {
        match parse_edge(arg)? {
            (source, Some(target)) => graph.add_edge(source, target),
            (node, None) => {
                graph.add_node(node);
            }
        }
    }
    for arg in &input.orders {
        let (node, rank) = parse_order(arg)?;
        graph.set_order(node, rank);
    }
    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "Graph loaded");
    Ok(graph)
}

fn print_positions(positions: &HashMap<Vertex<&str>, Point>) {
    let mut rows: Vec<_> = positions.iter().collect();
    rows.sort_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).reverse().then(a.x.total_cmp(&b.x)));
    for (vertex, point) in rows {
        println!("{vertex}\t{}\t{}", point.x, point.y);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match args.layout {
        Layout::Layered { input, rounds, dx, dy } => {
            let graph = build_graph(&input)?;
            let layout = SiftingLayout {
                rounds,
                spacing: Vec2::new(dx, dy),
            };
            let drawing = layout
                .compute_layers(&graph)
                .map_err(|err| anyhow!("layered layout failed: {err}"))?;
            print_positions(&layout.compute_positions(&drawing));
            for (source, target, role) in drawing.edges() {
                println!("{source} -> {target}\t{role}");
            }
            println!("crossings\t{}", drawing.crossings);
        }
        Layout::Tree {
            input,
            spacing,
            level_spacing,
        } => {
            let graph = build_graph(&input)?;
            let positions = TreeLayout::new(spacing, level_spacing)
                .layout(&graph)
                .map_err(|err| anyhow!("tree layout failed: {err}"))?;
            print_positions(&positions);
        }
        Layout::LongestPath { input, spacing, dy } => {
            let graph = build_graph(&input)?;
            let drawing = SiftingLayout::new(0)
                .compute_layers(&graph)
                .map_err(|err| anyhow!("layering failed: {err}"))?;
            let positions = TreeLayout::new(spacing, dy)
                .layout_layers(&drawing)
                .map_err(|err| anyhow!("tree layout failed: {err}"))?;
            print_positions(&positions);
        }
    }
    Ok(())
}
