// SPDX-License-Identifier: MIT

//! Node model
//!
//! A node is identified by its id, declares its parents, and carries a
//! [`NodeKind`] tag that decides how a visitor is dispatched on it.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::graph::id::ROOT_ID;
use crate::graph::store::Graph;
use crate::visitor::{NodeRef, VisitResult, Visitor};

/// User-defined node behavior.
///
/// A task decides which visitor handler is called on its node. The default
/// routes to [`Visitor::visit_task`]; visitors reach the concrete task through
/// [`Node::task_as`].
pub trait Task: Any + fmt::Debug + Send + Sync {
    /// Dispatch the node into the visitor; `Ok(false)` stops this path.
    fn accept(&self, node: NodeRef<'_>, visitor: &mut dyn Visitor) -> VisitResult {
        visitor.visit_task(node)
    }

    fn as_any(&self) -> &dyn Any;
}

/// Variant tag of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Synthetic root anchoring parentless nodes
    Root,
    /// Plain node, routed to the visitor's default handler
    Basic,
    /// Node carrying a user task
    Task(Arc<dyn Task>),
    /// Node owning a nested graph
    Graph(Box<Graph>),
}

/// Unit of the execution graph
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    parents: BTreeSet<String>,
    fork_id: Option<String>,
    depth: usize,
    kind: NodeKind,
}

impl Node {
    /// Create a basic node
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_kind(id, NodeKind::Basic)
    }

    /// Create a node carrying a task
    pub fn task(id: impl Into<String>, task: impl Task) -> Self {
        Self::with_kind(id, NodeKind::Task(Arc::new(task)))
    }

    /// Create a node owning a nested graph
    pub fn graph(id: impl Into<String>, graph: Graph) -> Self {
        Self::with_kind(id, NodeKind::Graph(Box::new(graph)))
    }

    pub fn with_kind(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            parents: BTreeSet::new(),
            fork_id: None,
            depth: 0,
            kind,
        }
    }

    pub(crate) fn root() -> Self {
        Self::with_kind(ROOT_ID, NodeKind::Root)
    }

    /// Declare parents (replaces previously declared ones)
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Declare one more parent
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared parents. Empty for nodes hanging from the root.
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    /// Fork id, set only on nodes produced by a fork
    pub fn fork_id(&self) -> Option<&str> {
        self.fork_id.as_deref()
    }

    /// Execution layer: 1 + deepest parent, 0 for the root.
    ///
    /// Nodes sharing a depth never depend on each other.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    /// Nested graph of a graph node
    pub fn inner_graph(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::Graph(graph) => Some(graph),
            _ => None,
        }
    }

    /// Downcast the task carried by this node
    pub fn task_as<T: Task>(&self) -> Option<&T> {
        match &self.kind {
            NodeKind::Task(task) => task.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    pub(crate) fn set_fork_id(&mut self, fork_id: Option<String>) {
        self.fork_id = fork_id;
    }

    pub(crate) fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub(crate) fn parents_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.parents
    }
}
