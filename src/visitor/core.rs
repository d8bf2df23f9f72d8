// SPDX-License-Identifier: MIT

//! Visitor capability contract
//!
//! A visitor holds a [`VisitorState`] (direction, custom hooks, options,
//! progress sink) and overrides the hooks and handlers it cares about. Every
//! hook and handler has a no-op default.

use std::fmt;
use std::ops::Deref;

use crate::config::VisitOptions;
use crate::error::GraphError;
use crate::graph::{Graph, Node, ROOT_ID};
use crate::visitor::engine;
use crate::visitor::progress::{LogProgress, ProgressEvent, ProgressSink};

/// `Ok(true)` continues along the current path, `Ok(false)` stops it
pub type VisitResult = Result<bool, GraphError>;

type Predicate = Box<dyn Fn(&Node) -> bool>;
type Hook = Box<dyn FnMut(&Node) -> bool>;

struct CustomHook {
    predicate: Predicate,
    hook: Hook,
}

/// Node being visited, together with the graph that owns it
#[derive(Clone, Copy)]
pub struct NodeRef<'g> {
    node: &'g Node,
    graph: &'g Graph,
    depth: usize,
}

impl<'g> NodeRef<'g> {
    pub(crate) fn new(node: &'g Node, graph: &'g Graph, depth: usize) -> Self {
        Self { node, graph, depth }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    /// Graph owning the node (the nested graph inside a graph node)
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Graph node nesting depth, 0 for the top level graph
    pub fn nesting_depth(&self) -> usize {
        self.depth
    }

    pub fn successors(&self) -> Vec<&'g Node> {
        self.graph.successors(self.node.id())
    }

    pub fn predecessors(&self) -> Vec<&'g Node> {
        self.graph.predecessors(self.node.id())
    }
}

impl Deref for NodeRef<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.node
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.node.id())
            .field("depth", &self.depth)
            .finish()
    }
}

/// Traversal state shared by every visitor
#[derive(Default)]
pub struct VisitorState {
    /// Traverse in reverse topological order
    pub is_reversed: bool,
    pub options: VisitOptions,
    hooks: Vec<CustomHook>,
    progress: Option<Box<dyn ProgressSink>>,
    depth: usize,
}

impl fmt::Debug for VisitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitorState")
            .field("is_reversed", &self.is_reversed)
            .field("options", &self.options)
            .field("custom_hooks", &self.hooks.len())
            .field("has_progress", &self.progress.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

impl VisitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: VisitOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            is_reversed: true,
            ..self
        }
    }

    /// Register `hook` to fire on every node matching `predicate`, before the
    /// node is dispatched. A hook returning false stops the current path.
    pub fn register_custom_hook<P, H>(&mut self, predicate: P, hook: H)
    where
        P: Fn(&Node) -> bool + 'static,
        H: FnMut(&Node) -> bool + 'static,
    {
        self.hooks.push(CustomHook {
            predicate: Box::new(predicate),
            hook: Box::new(hook),
        });
    }

    pub fn set_progress_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.progress = Some(sink);
    }

    /// Current graph node nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fire matching custom hooks in registration order
    pub(crate) fn run_custom_hooks(&mut self, node: &Node) -> bool {
        let mut keep_going = true;
        for custom in self.hooks.iter_mut() {
            if (custom.predicate)(node) {
                keep_going &= (custom.hook)(node);
            }
        }
        keep_going
    }

    /// Reset per-traversal bookkeeping
    pub(crate) fn prepare(&mut self) {
        self.depth = 0;
        if self.options.with_progress && self.progress.is_none() {
            self.progress = Some(Box::new(LogProgress));
        }
    }

    pub(crate) fn enter_graph_node(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave_graph_node(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    pub(crate) fn report(&mut self, event: &ProgressEvent<'_>) {
        if let Some(sink) = self.progress.as_mut() {
            sink.update(event);
        }
    }
}

/// Stateful traversal consumer dispatched per node
pub trait Visitor {
    fn state(&self) -> &VisitorState;

    fn state_mut(&mut self) -> &mut VisitorState;

    /// Name used in progress reports
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Fired once at the beginning of each top level traversal
    fn hook_start(&mut self) {}

    /// Fired once when a top level traversal returns
    fn hook_end(&mut self) {}

    /// Fired before descending into a graph node
    fn hook_start_graph_node(&mut self, _node: NodeRef<'_>) {}

    /// Fired after the nested graph of a graph node has been traversed
    fn hook_end_graph_node(&mut self, _node: NodeRef<'_>) {}

    /// Fired before the first node of a forked branch
    fn hook_fork_started(&mut self, _node: NodeRef<'_>) {}

    /// Handler for basic nodes
    fn visit_default(&mut self, _node: NodeRef<'_>) -> VisitResult {
        Ok(true)
    }

    /// Handler for task nodes, reached through [`crate::graph::Task::accept`]
    fn visit_task(&mut self, _node: NodeRef<'_>) -> VisitResult {
        Ok(true)
    }

    /// Standard visitors receive every node here instead of going through the
    /// node's own dispatch. `None` means "not a standard visitor".
    fn visit_standard(&mut self, _node: NodeRef<'_>) -> Option<VisitResult> {
        None
    }

    fn is_reversed(&self) -> bool {
        self.state().is_reversed
    }

    fn set_reversed(&mut self, is_reversed: bool) {
        self.state_mut().is_reversed = is_reversed;
    }

    fn register_custom_hook<P, H>(&mut self, predicate: P, hook: H)
    where
        P: Fn(&Node) -> bool + 'static,
        H: FnMut(&Node) -> bool + 'static,
        Self: Sized,
    {
        self.state_mut().register_custom_hook(predicate, hook);
    }

    /// Traverse the whole graph; returns true when no path stopped
    fn visit(&mut self, graph: &Graph) -> VisitResult
    where
        Self: Sized,
    {
        engine::traverse(graph, ROOT_ID, self)
    }

    /// Traverse the descendants of `start` (inclusive)
    fn visit_from(&mut self, graph: &Graph, start: &str) -> VisitResult
    where
        Self: Sized,
    {
        engine::traverse(graph, start, self)
    }
}
