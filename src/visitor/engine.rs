// SPDX-License-Identifier: MIT

//! Traversal engine
//!
//! Walks a graph in topological order (or its reverse) and dispatches every
//! node to one or more visitors. A visitor returning `false` on a node stops
//! the paths going through that node for that visitor only; nodes still
//! reachable through another live path keep being visited.

use std::collections::HashSet;

use crate::error::GraphError;
use crate::graph::{Graph, NodeKind, ROOT_ID};
use crate::visitor::core::{NodeRef, VisitResult, Visitor};
use crate::visitor::progress::{ProgressEvent, ProgressSink};

/// Run a full top level traversal of `visitor` from `start`.
///
/// Returns `Ok(true)` when no path was stopped.
pub fn traverse(graph: &Graph, start: &str, visitor: &mut dyn Visitor) -> VisitResult {
    if !graph.contains(start) {
        return Err(GraphError::NodeNotFound(start.to_string()));
    }

    visitor.state_mut().prepare();
    visitor.hook_start();
    let reversed = visitor.is_reversed();
    log::debug!(
        "Visiting from '{}' with {}{}",
        start,
        visitor.name(),
        if reversed { " (reversed)" } else { "" }
    );

    let completed = {
        let mut slots: [&mut dyn Visitor; 1] = [&mut *visitor];
        walk(graph, start, &mut slots, reversed, 0, None)?
    };
    visitor.hook_end();
    Ok(completed.iter().all(|c| *c))
}

/// Shared pass of several visitors over the same graph.
///
/// Each visitor keeps its own set of live paths; the returned vector tells,
/// per visitor, whether every path ran to completion.
pub(crate) fn walk(
    graph: &Graph,
    start: &str,
    visitors: &mut [&mut dyn Visitor],
    reversed: bool,
    depth: usize,
    mut shared_sink: Option<&mut dyn ProgressSink>,
) -> Result<Vec<bool>, GraphError> {
    let mut order = graph.topological_order(start)?;
    if reversed {
        order.reverse();
    }
    let members: HashSet<&str> = order.iter().map(String::as_str).collect();
    let total = order.iter().filter(|id| id.as_str() != ROOT_ID).count();

    let mut continued: Vec<HashSet<&str>> = vec![HashSet::new(); visitors.len()];
    let mut completed = vec![true; visitors.len()];
    let mut done_per_visitor = vec![0usize; visitors.len()];
    let mut done = 0usize;

    for id in &order {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let node_ref = NodeRef::new(node, graph, depth);

        let neighbours: Vec<&str> = if reversed {
            graph
                .children_of(id)
                .iter()
                .map(String::as_str)
                .filter(|c| members.contains(c))
                .collect()
        } else {
            graph
                .parents_of(id)
                .map(|ps| {
                    ps.iter()
                        .map(String::as_str)
                        .filter(|p| members.contains(p))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut dispatched = false;
        for (slot, visitor) in visitors.iter_mut().enumerate() {
            let live = if reversed {
                neighbours.is_empty() || neighbours.iter().any(|n| continued[slot].contains(n))
            } else {
                id == start || neighbours.iter().any(|n| continued[slot].contains(n))
            };
            if !live {
                continue;
            }

            if visit_node(node_ref, &mut **visitor)? {
                continued[slot].insert(id.as_str());
            } else {
                completed[slot] = false;
            }

            if node.is_root() {
                continue;
            }
            dispatched = true;
            done_per_visitor[slot] += 1;
            if visitor.state().has_progress() {
                let name = visitor.name();
                visitor.state_mut().report(&ProgressEvent {
                    visitor: &name,
                    node_id: id,
                    done: done_per_visitor[slot],
                    total,
                    depth,
                });
            }
        }

        if dispatched {
            done += 1;
            if let Some(sink) = shared_sink.as_deref_mut() {
                sink.update(&ProgressEvent {
                    visitor: "composition",
                    node_id: id,
                    done,
                    total,
                    depth,
                });
            }
        }
    }

    Ok(completed)
}

/// Hooks then dispatch for a single live node
fn visit_node(node_ref: NodeRef<'_>, visitor: &mut dyn Visitor) -> VisitResult {
    let node = node_ref.node();
    if node.is_root() {
        return Ok(true);
    }
    if is_fork_head(node_ref) {
        visitor.hook_fork_started(node_ref);
    }
    if !visitor.state_mut().run_custom_hooks(node) {
        log::debug!("Custom hook stopped the path at '{}'", node.id());
        return Ok(false);
    }
    dispatch(node_ref, visitor)
}

/// First node of a forked branch: none of its parents belong to the same fork
fn is_fork_head(node_ref: NodeRef<'_>) -> bool {
    match node_ref.fork_id() {
        Some(fork) => !node_ref
            .predecessors()
            .iter()
            .any(|p| p.fork_id() == Some(fork)),
        None => false,
    }
}

fn dispatch(node_ref: NodeRef<'_>, visitor: &mut dyn Visitor) -> VisitResult {
    match node_ref.kind() {
        NodeKind::Root => Ok(true),
        NodeKind::Graph(inner) => {
            let inner_completed = descend(node_ref, inner, visitor)?;
            match visitor.visit_standard(node_ref) {
                Some(result) => result,
                None => Ok(inner_completed),
            }
        }
        NodeKind::Basic => match visitor.visit_standard(node_ref) {
            Some(result) => result,
            None => visitor.visit_default(node_ref),
        },
        NodeKind::Task(task) => match visitor.visit_standard(node_ref) {
            Some(result) => result,
            None => task.accept(node_ref, visitor),
        },
    }
}

/// Traverse the nested graph of a graph node with the same visitor
fn descend(node_ref: NodeRef<'_>, inner: &Graph, visitor: &mut dyn Visitor) -> VisitResult {
    let state = visitor.state();
    if let Some(limit) = state.options.max_depth {
        if state.depth() >= limit {
            return Err(GraphError::DepthLimitExceeded {
                node: node_ref.id().to_string(),
                limit,
            });
        }
    }

    visitor.hook_start_graph_node(node_ref);
    visitor.state_mut().enter_graph_node();
    let nested_depth = visitor.state().depth();
    let reversed = visitor.is_reversed();

    let outcome = {
        let mut slots: [&mut dyn Visitor; 1] = [&mut *visitor];
        walk(inner, ROOT_ID, &mut slots, reversed, nested_depth, None)
    };
    visitor.state_mut().leave_graph_node();
    let completed = outcome?;
    visitor.hook_end_graph_node(node_ref);
    Ok(completed.iter().all(|c| *c))
}
