//! Standard visitors
//!
//! These receive every node through [`Visitor::visit_standard`], whatever its
//! kind, so they work on graphs carrying arbitrary tasks.

use std::collections::HashSet;

use crate::config::VisitOptions;
use crate::error::{IntegrityError, IntegrityViolation};
use crate::graph::Node;
use crate::visitor::core::{NodeRef, VisitResult, Visitor, VisitorState};

type NodePredicate = Box<dyn Fn(&Node) -> bool>;

/// Finds the first node matching a predicate.
///
/// Once a match is recorded every later node stops its path.
pub struct FindFirstVisitor {
    state: VisitorState,
    predicate: NodePredicate,
    result: Option<Node>,
}

impl FindFirstVisitor {
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&Node) -> bool + 'static,
    {
        Self::with_options(predicate, VisitOptions::default())
    }

    pub fn with_options<P>(predicate: P, options: VisitOptions) -> Self
    where
        P: Fn(&Node) -> bool + 'static,
    {
        Self {
            state: VisitorState::with_options(options),
            predicate: Box::new(predicate),
            result: None,
        }
    }

    /// Limit how deep graph nodes are entered
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.state.options = self.state.options.with_max_depth(max_depth);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.state.is_reversed = true;
        self
    }

    pub fn found(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Node> {
        self.result.as_ref()
    }
}

impl Visitor for FindFirstVisitor {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn hook_start(&mut self) {
        self.result = None;
    }

    fn visit_standard(&mut self, node: NodeRef<'_>) -> Option<VisitResult> {
        if self.result.is_some() {
            return Some(Ok(false));
        }
        if (self.predicate)(node.node()) {
            log::debug!("Found matching node '{}'", node.id());
            self.result = Some(node.node().clone());
            return Some(Ok(false));
        }
        Some(Ok(true))
    }
}

/// Collects every node matching a predicate, in visit order
pub struct FindAllVisitor {
    state: VisitorState,
    predicate: NodePredicate,
    results: Vec<Node>,
}

impl FindAllVisitor {
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&Node) -> bool + 'static,
    {
        Self::with_options(predicate, VisitOptions::default())
    }

    pub fn with_options<P>(predicate: P, options: VisitOptions) -> Self
    where
        P: Fn(&Node) -> bool + 'static,
    {
        Self {
            state: VisitorState::with_options(options),
            predicate: Box::new(predicate),
            results: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.state.options = self.state.options.with_max_depth(max_depth);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.state.is_reversed = true;
        self
    }

    pub fn count(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[Node] {
        &self.results
    }

    pub fn into_results(self) -> Vec<Node> {
        self.results
    }
}

impl Visitor for FindAllVisitor {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn hook_start(&mut self) {
        self.results.clear();
    }

    fn visit_standard(&mut self, node: NodeRef<'_>) -> Option<VisitResult> {
        if (self.predicate)(node.node()) {
            self.results.push(node.node().clone());
        }
        Some(Ok(true))
    }
}

/// Counts visited nodes, nested ones included
#[derive(Debug, Default)]
pub struct LengthVisitor {
    state: VisitorState,
    count: usize,
}

impl LengthVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: VisitOptions) -> Self {
        Self {
            state: VisitorState::with_options(options),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Visitor for LengthVisitor {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn hook_start(&mut self) {
        self.count = 0;
    }

    fn visit_standard(&mut self, _node: NodeRef<'_>) -> Option<VisitResult> {
        self.count += 1;
        Some(Ok(true))
    }
}

/// Checks that declared parents, adjacency and ids agree.
///
/// Violations are collected, never raised during the traversal; read them
/// with [`ValidateGraphIntegrity::result`].
#[derive(Debug, Default)]
pub struct ValidateGraphIntegrity {
    state: VisitorState,
    /// Ids seen so far, one set per graph scope
    scopes: Vec<HashSet<String>>,
    violations: Vec<IntegrityViolation>,
}

impl ValidateGraphIntegrity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: VisitOptions) -> Self {
        Self {
            state: VisitorState::with_options(options),
            ..Self::default()
        }
    }

    pub fn violations(&self) -> &[IntegrityViolation] {
        &self.violations
    }

    pub fn result(&self) -> Result<(), IntegrityError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(IntegrityError {
                violations: self.violations.clone(),
            })
        }
    }
}

impl Visitor for ValidateGraphIntegrity {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn hook_start(&mut self) {
        self.violations.clear();
        self.scopes = vec![HashSet::new()];
    }

    fn hook_end(&mut self) {
        if !self.violations.is_empty() {
            log::warn!(
                "Graph integrity check found {} violation(s)",
                self.violations.len()
            );
        }
    }

    fn hook_start_graph_node(&mut self, _node: NodeRef<'_>) {
        self.scopes.push(HashSet::new());
    }

    fn hook_end_graph_node(&mut self, _node: NodeRef<'_>) {
        self.scopes.pop();
    }

    fn visit_standard(&mut self, node: NodeRef<'_>) -> Option<VisitResult> {
        let graph = node.graph();
        let id = node.id();

        if let Some(scope) = self.scopes.last_mut() {
            if !scope.insert(id.to_string()) {
                self.violations
                    .push(IntegrityViolation::DuplicateId(id.to_string()));
            }
        }

        for parent in node.parents() {
            if !graph.contains(parent) {
                self.violations.push(IntegrityViolation::DanglingParent {
                    node: id.to_string(),
                    parent: parent.clone(),
                });
            } else if !graph.children_of(parent).iter().any(|c| c == id) {
                self.violations.push(IntegrityViolation::MissingEdge {
                    parent: parent.clone(),
                    node: id.to_string(),
                });
            }
        }

        for child in graph.children_of(id) {
            if !graph.contains(child) {
                self.violations.push(IntegrityViolation::DanglingEdge {
                    from: id.to_string(),
                    to: child.clone(),
                });
            }
        }
        if let Some(parents) = graph.parents_of(id) {
            for parent in parents.iter().filter(|p| !graph.contains(p)) {
                self.violations.push(IntegrityViolation::DanglingEdge {
                    from: parent.clone(),
                    to: id.to_string(),
                });
            }
        }

        Some(Ok(true))
    }
}
