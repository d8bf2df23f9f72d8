// SPDX-License-Identifier: MIT

//! Graph loader - YAML definition loading and graph building

pub mod types;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::GraphOptions;
use crate::error::ExecGraphError;
use crate::graph::{Graph, Node, NodeKind};

pub use types::{DependsOn, ForkDefinition, GraphDefinition, NodeDefinition, Step};

/// Builds execution graphs from YAML definitions
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphLoader {
    options: GraphOptions,
}

impl GraphLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graphs built by this loader (nested ones included) use `options`
    pub fn with_options(options: GraphOptions) -> Self {
        Self { options }
    }

    /// Load a graph definition from a YAML file
    pub fn load_definition<P: AsRef<Path>>(&self, path: P) -> Result<GraphDefinition, ExecGraphError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, ExecGraphError> {
        let def: GraphDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }

    /// Load and build a graph from a YAML file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Graph, ExecGraphError> {
        let def = self.load_definition(path)?;
        self.build(&def)
    }

    /// Parse and build a graph from a YAML string
    pub fn from_yaml(&self, content: &str) -> Result<Graph, ExecGraphError> {
        let def = Self::parse_yaml(content)?;
        self.build(&def)
    }

    /// Build a graph from a parsed definition
    pub fn build(&self, def: &GraphDefinition) -> Result<Graph, ExecGraphError> {
        let mut graph = Graph::with_options(self.options);
        let nodes = def
            .nodes
            .iter()
            .map(|node_def| self.build_node(node_def))
            .collect::<Result<Vec<_>, _>>()?;
        graph.add_nodes(nodes)?;

        for fork in &def.forks {
            match &fork.kind {
                Some(kind) => {
                    let head = NodeKind::Task(Arc::new(Step {
                        kind: kind.clone(),
                        params: fork.params.clone(),
                    }));
                    graph.fork_from_node_with(
                        &fork.from,
                        &fork.fork_id,
                        fork.join.as_deref(),
                        head,
                    )?
                }
                None => graph.fork_from_node(&fork.from, &fork.fork_id, fork.join.as_deref())?,
            };
        }

        log::info!(
            "Built graph{} with {} nodes ({} forks applied)",
            def.name
                .as_ref()
                .map(|n| format!(" '{}'", n))
                .unwrap_or_default(),
            graph.len(),
            def.forks.len()
        );
        Ok(graph)
    }

    fn build_node(&self, def: &NodeDefinition) -> Result<Node, ExecGraphError> {
        let node = match (&def.kind, &def.graph) {
            (Some(_), Some(_)) => {
                return Err(ExecGraphError::config(format!(
                    "Node '{}' cannot declare both a kind and a nested graph",
                    def.id
                )))
            }
            (Some(kind), None) => Node::task(
                def.id.clone(),
                Step {
                    kind: kind.clone(),
                    params: def.params.clone(),
                },
            ),
            (None, Some(inner)) => {
                log::debug!("Building nested graph for node '{}'", def.id);
                Node::graph(def.id.clone(), self.build(inner)?)
            }
            (None, None) => Node::new(def.id.clone()),
        };
        Ok(node.with_parents(def.depends_on.to_vec()))
    }
}
