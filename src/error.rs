// SPDX-License-Identifier: MIT

//! Typed error handling for execgraph-rs
//!
//! `GraphError` covers everything the graph store, the fork engine and the
//! visitor engine can fail with. `ExecGraphError` wraps it together with the
//! I/O and parsing failures of the loader, the configuration and the CLI.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error raised by user task or visitor code.
pub type TaskError = Box<dyn StdError + Send + Sync>;

/// Top-level error type for execgraph-rs
#[derive(Debug, Error)]
pub enum ExecGraphError {
    /// Structural or traversal errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Integrity report produced by a validation pass
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Configuration errors (invalid env vars, invalid option files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ExecGraphError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors raised while building, mutating or traversing a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Id is empty or contains the reserved separator
    #[error("Invalid node id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// A node with the same id is already in the graph
    #[error("Node '{0}' is already in the execution graph")]
    DuplicateId(String),

    /// A declared parent is not in the graph
    #[error("Node '{node}' depends on '{parent}' which is not in the execution graph")]
    MissingParent { node: String, parent: String },

    /// Batch insertion could not order the remaining nodes (cycle or missing parent)
    #[error("Unresolvable dependencies for nodes: {0:?}")]
    UnresolvableDependency(Vec<String>),

    /// Node lookup failed
    #[error("Node '{0}' not found in the execution graph")]
    NodeNotFound(String),

    /// Deletion refused because the node still has children
    #[error("Node '{node}' still has children: {children:?}")]
    NodeHasChildren { node: String, children: Vec<String> },

    /// Fork request does not describe a valid region
    #[error("Invalid fork: {0}")]
    InvalidFork(String),

    /// A node of the forked region feeds outside of it somewhere else than the join
    #[error("Ambiguous join on '{join}': '{node}' also feeds '{target}' outside of the forked region")]
    AmbiguousJoin {
        join: String,
        node: String,
        target: String,
    },

    /// Nested graph descent went deeper than the configured limit
    #[error("Depth limit {limit} exceeded when entering graph node '{node}'")]
    DepthLimitExceeded { node: String, limit: usize },

    /// Visitor composition is not coherent
    #[error("Invalid visitor composition: {0}")]
    Composition(String),

    /// Error raised by user node or visitor code, passed through unchanged
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl GraphError {
    /// Create an invalid id error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing parent error
    pub fn missing_parent(node: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::MissingParent {
            node: node.into(),
            parent: parent.into(),
        }
    }

    /// Create an invalid fork error
    pub fn invalid_fork(message: impl Into<String>) -> Self {
        Self::InvalidFork(message.into())
    }

    /// Create an error from a user task failure
    pub fn task(err: impl Into<TaskError>) -> Self {
        Self::Task(err.into())
    }
}

/// A single structural problem found by `ValidateGraphIntegrity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Declared parent does not exist in the graph
    DanglingParent { node: String, parent: String },
    /// Adjacency edge whose endpoint does not exist
    DanglingEdge { from: String, to: String },
    /// Declared parent exists but the edge parent -> node is missing
    MissingEdge { parent: String, node: String },
    /// Same id encountered twice within one graph
    DuplicateId(String),
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DanglingParent { node, parent } => {
                write!(f, "node '{}' references missing parent '{}'", node, parent)
            }
            Self::DanglingEdge { from, to } => {
                write!(f, "edge '{}' -> '{}' has a missing endpoint", from, to)
            }
            Self::MissingEdge { parent, node } => {
                write!(f, "edge '{}' -> '{}' is declared but not wired", parent, node)
            }
            Self::DuplicateId(id) => write!(f, "node '{}' encountered twice", id),
        }
    }
}

/// Aggregated integrity report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Graph integrity violated ({} violation(s)): {}", .violations.len(), join_violations(.violations))]
pub struct IntegrityError {
    pub violations: Vec<IntegrityViolation>,
}

fn join_violations(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
