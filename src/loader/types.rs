// SPDX-License-Identifier: MIT

//! YAML schema types for graph definitions

use std::any::Any;

use serde::Deserialize;

use crate::graph::Task;

/// Top-level graph definition
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GraphDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Nodes, in any order
    pub nodes: Vec<NodeDefinition>,
    /// Forks applied in order once every node is in place
    #[serde(default)]
    pub forks: Vec<ForkDefinition>,
}

/// A node of the graph
#[derive(Debug, Deserialize, Clone)]
pub struct NodeDefinition {
    pub id: String,
    /// Nodes this one depends on
    #[serde(default)]
    pub depends_on: DependsOn,
    /// Step kind; the node carries a [`Step`] task when set
    #[serde(default)]
    pub kind: Option<String>,
    /// Free-form step parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Inline nested graph; the node becomes a graph node
    #[serde(default)]
    pub graph: Option<Box<GraphDefinition>>,
}

/// Dependency specification (single string or array)
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependsOn {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl DependsOn {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            DependsOn::None => vec![],
            DependsOn::Single(s) => vec![s.clone()],
            DependsOn::Multiple(v) => v.clone(),
        }
    }
}

/// Fork request
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ForkDefinition {
    pub from: String,
    pub fork_id: String,
    #[serde(default)]
    pub join: Option<String>,
    /// Step kind run by the head of the fork instead of the source's payload
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Task attached to nodes declared with a `kind`
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: String,
    pub params: serde_json::Value,
}

impl Task for Step {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
