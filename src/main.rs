use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;

use execgraph_rs::config::Settings;
use execgraph_rs::graph::{Graph, Node, ROOT_ID};
use execgraph_rs::loader::GraphLoader;
use execgraph_rs::visitor::{FindAllVisitor, LengthVisitor, ValidateGraphIntegrity, Visitor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the structural integrity of a graph definition
    Validate {
        /// Path to the graph definition
        #[arg(short, long)]
        file: String,
    },
    /// Print node counts and execution layers
    Stats {
        #[arg(short, long)]
        file: String,
    },
    /// Print the topological order of the graph
    Order {
        #[arg(short, long)]
        file: String,

        /// Reverse topological order
        #[arg(short, long)]
        reverse: bool,
    },
    /// List nodes whose id starts with a prefix
    Find {
        #[arg(short, long)]
        file: String,

        #[arg(short, long)]
        prefix: String,
    },
}

#[derive(Serialize, Debug)]
struct Stats {
    nodes: usize,
    nodes_with_nested: usize,
    layers: BTreeMap<usize, usize>,
    forks: BTreeSet<String>,
}

#[derive(Serialize, Debug)]
struct OrderEntry<'a> {
    id: &'a str,
    depth: usize,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::default().from_env()?;
    let loader = GraphLoader::with_options(settings.graph);

    let load = |file: &str| -> anyhow::Result<Graph> {
        loader
            .load(file)
            .with_context(|| format!("Failed to load graph from {}", file))
    };

    match args.command {
        Commands::Validate { file } => {
            let graph = load(&file)?;
            let mut check = ValidateGraphIntegrity::with_options(settings.visit);
            check.visit(&graph)?;
            if args.json {
                let report: Vec<String> =
                    check.violations().iter().map(|v| v.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if check.violations().is_empty() {
                println!("{}: ok ({} nodes)", file, graph.len());
            } else {
                for violation in check.violations() {
                    println!("{}", violation);
                }
            }
            check.result()?;
        }
        Commands::Stats { file } => {
            let graph = load(&file)?;
            let mut length = LengthVisitor::with_options(settings.visit);
            length.visit(&graph)?;

            let mut stats = Stats {
                nodes: graph.len(),
                nodes_with_nested: length.len(),
                layers: BTreeMap::new(),
                forks: BTreeSet::new(),
            };
            for node in graph.node_ids().into_iter().filter_map(|id| graph.node(id)) {
                *stats.layers.entry(node.depth()).or_default() += 1;
                if let Some(fork) = node.fork_id() {
                    stats.forks.insert(fork.to_string());
                }
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "Nodes: {} ({} including nested graphs)",
                    stats.nodes, stats.nodes_with_nested
                );
                for (depth, count) in &stats.layers {
                    println!("  depth {}: {} node(s)", depth, count);
                }
                println!("Forks: {}", stats.forks.len());
            }
        }
        Commands::Order { file, reverse } => {
            let graph = load(&file)?;
            let mut order = graph.topological_order(ROOT_ID)?;
            order.retain(|id| id != ROOT_ID);
            if reverse {
                order.reverse();
            }
            let entries: Vec<OrderEntry<'_>> = order
                .iter()
                .filter_map(|id| graph.node(id))
                .map(|node| OrderEntry {
                    id: node.id(),
                    depth: node.depth(),
                })
                .collect();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    println!("{:>3}  {}", entry.depth, entry.id);
                }
            }
        }
        Commands::Find { file, prefix } => {
            let graph = load(&file)?;
            let needle = prefix.clone();
            let mut find = FindAllVisitor::with_options(
                move |node: &Node| node.id().starts_with(&needle),
                settings.visit,
            );
            find.visit(&graph)?;
            let ids: Vec<&str> = find.results().iter().map(Node::id).collect();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else if ids.is_empty() {
                println!("No node starts with '{}'", prefix);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
    }

    Ok(())
}
