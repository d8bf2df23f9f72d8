// SPDX-License-Identifier: MIT

//! Visitor composition
//!
//! Runs `before` visitors one after the other, then every `action` visitor in
//! a single shared pass (all of them see node N before any sees node N+1),
//! then `after` visitors one after the other.

use crate::config::VisitOptions;
use crate::error::GraphError;
use crate::graph::{Graph, ROOT_ID};
use crate::visitor::core::{VisitResult, Visitor};
use crate::visitor::engine::{traverse, walk};
use crate::visitor::progress::{LogProgress, ProgressSink};

/// Ordered composition of borrowed visitors
#[derive(Default)]
pub struct VisitorComposer<'a> {
    before: Vec<&'a mut dyn Visitor>,
    action: Vec<&'a mut dyn Visitor>,
    after: Vec<&'a mut dyn Visitor>,
    progress: Option<Box<dyn ProgressSink>>,
}

impl<'a> VisitorComposer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visitor running its own traversal before the action pass
    pub fn before(mut self, visitor: &'a mut dyn Visitor) -> Self {
        self.before.push(visitor);
        self
    }

    /// Visitor taking part in the shared action pass
    pub fn action(mut self, visitor: &'a mut dyn Visitor) -> Self {
        self.action.push(visitor);
        self
    }

    /// Visitor running its own traversal after the action pass
    pub fn after(mut self, visitor: &'a mut dyn Visitor) -> Self {
        self.after.push(visitor);
        self
    }

    /// Report progress of the action pass as a whole
    pub fn with_progress_on_actions(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_options(self, options: VisitOptions) -> Self {
        if options.with_progress {
            self.with_progress_on_actions(Box::new(LogProgress))
        } else {
            self
        }
    }

    pub fn visit(&mut self, graph: &Graph) -> VisitResult {
        self.visit_from(graph, ROOT_ID)
    }

    /// Run the three phases from `start`; true when no path stopped in any
    /// of them
    pub fn visit_from(&mut self, graph: &Graph, start: &str) -> VisitResult {
        let reversed = self.action_direction()?;
        if !graph.contains(start) {
            return Err(GraphError::NodeNotFound(start.to_string()));
        }

        let mut completed = true;
        for visitor in self.before.iter_mut() {
            completed &= traverse(graph, start, &mut **visitor)?;
        }

        log::debug!(
            "Shared action pass of {} visitors from '{}'",
            self.action.len(),
            start
        );
        for visitor in self.action.iter_mut() {
            visitor.state_mut().prepare();
            visitor.hook_start();
        }
        let outcome = walk(
            graph,
            start,
            &mut self.action,
            reversed,
            0,
            self.progress
                .as_mut()
                .map(|sink| sink.as_mut() as &mut dyn ProgressSink),
        )?;
        for visitor in self.action.iter_mut() {
            visitor.hook_end();
        }
        completed &= outcome.iter().all(|c| *c);

        for visitor in self.after.iter_mut() {
            completed &= traverse(graph, start, &mut **visitor)?;
        }
        Ok(completed)
    }

    /// Common direction of the action visitors
    fn action_direction(&self) -> Result<bool, GraphError> {
        let Some(first) = self.action.first() else {
            return Err(GraphError::Composition(
                "at least one action visitor is required".to_string(),
            ));
        };
        let reversed = first.is_reversed();
        if let Some(odd) = self.action.iter().find(|v| v.is_reversed() != reversed) {
            return Err(GraphError::Composition(format!(
                "action visitors must share one direction, {} does not",
                odd.name()
            )));
        }
        Ok(reversed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::Node;
    use crate::visitor::core::{NodeRef, VisitorState};
    use crate::visitor::progress::ProgressEvent;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Tagged {
        state: VisitorState,
        tag: &'static str,
        journal: Journal,
    }

    impl Tagged {
        fn new(tag: &'static str, journal: &Journal) -> Self {
            Self {
                state: VisitorState::new(),
                tag,
                journal: Rc::clone(journal),
            }
        }
    }

    impl Visitor for Tagged {
        fn state(&self) -> &VisitorState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut VisitorState {
            &mut self.state
        }

        fn hook_start(&mut self) {
            self.journal.borrow_mut().push(format!("{}:start", self.tag));
        }

        fn hook_end(&mut self) {
            self.journal.borrow_mut().push(format!("{}:end", self.tag));
        }

        fn visit_default(&mut self, node: NodeRef<'_>) -> VisitResult {
            self.journal
                .borrow_mut()
                .push(format!("{}:{}", self.tag, node.id()));
            Ok(true)
        }
    }

    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_nodes(vec![Node::new("a"), Node::new("b").with_parent("a")])
            .unwrap();
        graph
    }

    #[test]
    fn test_phases_and_interleaving() {
        let journal: Journal = Rc::default();
        let mut pre = Tagged::new("pre", &journal);
        let mut one = Tagged::new("one", &journal);
        let mut two = Tagged::new("two", &journal);
        let mut post = Tagged::new("post", &journal);

        let graph = chain();
        let completed = VisitorComposer::new()
            .before(&mut pre)
            .action(&mut one)
            .action(&mut two)
            .after(&mut post)
            .visit(&graph)
            .unwrap();
        assert!(completed);

        #[rustfmt::skip]
        let expected = [
            "pre:start", "pre:a", "pre:b", "pre:end",
            "one:start", "two:start",
            "one:a", "two:a", "one:b", "two:b",
            "one:end", "two:end",
            "post:start", "post:a", "post:b", "post:end",
        ];
        assert_eq!(*journal.borrow(), expected);
    }

    #[test]
    fn test_mixed_directions_rejected() {
        let journal: Journal = Rc::default();
        let mut one = Tagged::new("one", &journal);
        let mut two = Tagged::new("two", &journal);
        two.set_reversed(true);

        let err = VisitorComposer::new()
            .action(&mut one)
            .action(&mut two)
            .visit(&chain())
            .unwrap_err();
        assert!(matches!(err, GraphError::Composition(_)));
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_empty_action_list_rejected() {
        let err = VisitorComposer::new().visit(&chain()).unwrap_err();
        assert!(matches!(err, GraphError::Composition(_)));
    }

    #[test]
    fn test_shared_progress_counts_nodes_once() {
        let journal: Journal = Rc::default();
        let mut one = Tagged::new("one", &journal);
        let mut two = Tagged::new("two", &journal);
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let sink_ticks = Rc::clone(&ticks);

        VisitorComposer::new()
            .action(&mut one)
            .action(&mut two)
            .with_progress_on_actions(Box::new(move |e: &ProgressEvent<'_>| {
                sink_ticks.borrow_mut().push(e.done)
            }))
            .visit(&chain())
            .unwrap();
        assert_eq!(*ticks.borrow(), vec![1, 2]);
    }
}
