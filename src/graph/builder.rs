// SPDX-License-Identifier: MIT

//! Graph builder - insertion, deletion and replacement of nodes
//!
//! Every operation validates first and mutates last, so a failing call leaves
//! the graph as it was.

use std::collections::{BTreeSet, HashSet};

use crate::config::DeletePolicy;
use crate::error::GraphError;
use crate::graph::id::{validate_id, ROOT_ID};
use crate::graph::node::Node;
use crate::graph::store::Graph;

impl Graph {
    /// Add a node whose parents are already in the graph
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        validate_id(node.id())?;
        if self.contains(node.id()) {
            return Err(GraphError::DuplicateId(node.id().to_string()));
        }
        if let Some(missing) = node.parents().iter().find(|p| !self.contains(p)) {
            return Err(GraphError::missing_parent(node.id(), missing.as_str()));
        }

        log::debug!(
            "Adding node '{}' with parents {:?}",
            node.id(),
            node.parents()
        );
        self.attach(node);
        Ok(())
    }

    /// Add a batch of nodes given in any order.
    ///
    /// The batch is sorted so that every node comes after its parents; nodes
    /// that can never be placed (cycle, or parent missing from both the graph
    /// and the batch) fail the whole batch.
    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<(), GraphError> {
        let mut batch_ids = HashSet::new();
        for node in &nodes {
            validate_id(node.id())?;
            if self.contains(node.id()) || !batch_ids.insert(node.id().to_string()) {
                return Err(GraphError::DuplicateId(node.id().to_string()));
            }
        }

        let total = nodes.len();
        let mut resolved: HashSet<String> = HashSet::new();
        let mut ordered: Vec<Node> = Vec::with_capacity(total);
        let mut pending = nodes;
        let mut pass = 0;

        while !pending.is_empty() {
            pass += 1;
            let (ready, rest): (Vec<Node>, Vec<Node>) = pending.into_iter().partition(|n| {
                n.parents()
                    .iter()
                    .all(|p| self.contains(p) || resolved.contains(p))
            });

            if ready.is_empty() {
                let stuck: Vec<String> = rest.iter().map(|n| n.id().to_string()).collect();
                log::warn!("Cannot order nodes after {} passes: {:?}", pass, stuck);
                return Err(GraphError::UnresolvableDependency(stuck));
            }

            resolved.extend(ready.iter().map(|n| n.id().to_string()));
            ordered.extend(ready);
            pending = rest;
        }

        for node in ordered {
            self.attach(node);
        }
        log::debug!("Added {} nodes in {} passes", total, pass);
        Ok(())
    }

    /// Delete a node according to the graph's [`DeletePolicy`]
    pub fn delete_node(&mut self, id: &str) -> Result<Node, GraphError> {
        if id == ROOT_ID {
            return Err(GraphError::invalid_id(id, "the root node cannot be deleted"));
        }
        let (declared, children) = match self.node(id) {
            Some(node) => (node.parents().clone(), self.children_of(id).to_vec()),
            None => return Err(GraphError::NodeNotFound(id.to_string())),
        };

        let policy = self.options.delete_policy;
        if policy == DeletePolicy::Reject && !children.is_empty() {
            return Err(GraphError::NodeHasChildren {
                node: id.to_string(),
                children,
            });
        }

        let removed = self
            .detach(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        for child in &children {
            if policy == DeletePolicy::Reparent {
                if let Some(child_node) = self.nodes.get_mut(child) {
                    let parents = child_node.parents_mut();
                    parents.remove(id);
                    parents.extend(declared.iter().cloned());
                }
            }
            self.rewire(child);
        }
        self.refresh_depths();

        log::debug!(
            "Deleted node '{}' ({:?}), {} children rewired",
            id,
            policy,
            children.len()
        );
        Ok(removed)
    }

    /// Remove a node together with everything that depends on it
    pub fn remove_branch(&mut self, id: &str) -> Result<Vec<String>, GraphError> {
        if id == ROOT_ID {
            return Err(GraphError::invalid_id(id, "the root node cannot be removed"));
        }
        let order = self.topological_order(id)?;
        for node_id in &order {
            self.detach(node_id);
        }
        self.refresh_depths();
        log::debug!("Removed branch '{}' ({} nodes)", id, order.len());
        Ok(order)
    }

    /// Replace the node `old_id` by `new_node`, keeping its edges, fork id and
    /// depth. A different id on `new_node` renames the node.
    pub fn replace_node(&mut self, old_id: &str, mut new_node: Node) -> Result<Node, GraphError> {
        if old_id == ROOT_ID {
            return Err(GraphError::invalid_id(old_id, "the root node cannot be replaced"));
        }
        let new_id = new_node.id().to_string();
        {
            let previous = self
                .node(old_id)
                .ok_or_else(|| GraphError::NodeNotFound(old_id.to_string()))?;
            if new_id != old_id {
                validate_id(&new_id)?;
                if self.contains(&new_id) {
                    return Err(GraphError::DuplicateId(new_id));
                }
            }
            *new_node.parents_mut() = previous.parents().clone();
            new_node.set_fork_id(previous.fork_id().map(str::to_string));
            new_node.set_depth(previous.depth());
        }

        if new_id == old_id {
            let slot = self
                .nodes
                .get_mut(old_id)
                .ok_or_else(|| GraphError::NodeNotFound(old_id.to_string()))?;
            return Ok(std::mem::replace(slot, new_node));
        }

        let previous = self
            .nodes
            .remove(old_id)
            .ok_or_else(|| GraphError::NodeNotFound(old_id.to_string()))?;
        self.rename_edges(old_id, &new_id);
        self.nodes.insert(new_id.clone(), new_node);
        log::debug!("Renamed node '{}' to '{}'", old_id, new_id);
        Ok(previous)
    }

    /// Copy the part of the graph reachable from `from`, stopping (inclusive)
    /// at any of `to_nodes`. Parents outside of the copy are dropped.
    pub fn sub_graph(&self, from: &str, to_nodes: &[&str]) -> Result<Graph, GraphError> {
        self.sub_graph_with_removed(from, to_nodes).map(|(copy, _)| copy)
    }

    /// Same as [`Graph::sub_graph`], also returning for each copied node the
    /// declared parents cut at the copy boundary. Nodes that lost no parent
    /// are left out.
    pub fn sub_graph_with_removed(
        &self,
        from: &str,
        to_nodes: &[&str],
    ) -> Result<(Graph, Vec<(String, BTreeSet<String>)>), GraphError> {
        if !self.contains(from) {
            return Err(GraphError::NodeNotFound(from.to_string()));
        }
        if let Some(missing) = to_nodes.iter().find(|id| !self.contains(id)) {
            return Err(GraphError::NodeNotFound(missing.to_string()));
        }

        let mut members: HashSet<&str> = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if !members.insert(id) || to_nodes.contains(&id) {
                continue;
            }
            stack.extend(self.children_of(id).iter().map(String::as_str));
        }

        let mut copy = Graph::with_options(self.options);
        let mut removed = Vec::new();
        for id in self.topological_order(from)? {
            if id == ROOT_ID || !members.contains(id.as_str()) {
                continue;
            }
            if let Some(node) = self.node(&id) {
                let mut node = node.clone();
                let (kept, cut): (BTreeSet<String>, BTreeSet<String>) = node
                    .parents()
                    .iter()
                    .cloned()
                    .partition(|p| members.contains(p.as_str()));
                *node.parents_mut() = kept;
                if !cut.is_empty() {
                    removed.push((id.clone(), cut));
                }
                copy.attach(node);
            }
        }
        log::debug!(
            "Copied {} nodes from '{}', {} cut at the boundary",
            copy.len(),
            from,
            removed.len()
        );
        Ok((copy, removed))
    }

    /// Align the effective parents of `id` with its declared parents; parents
    /// that no longer exist are ignored and an orphan hangs from the root.
    pub(crate) fn rewire(&mut self, id: &str) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let mut target: BTreeSet<String> = node
            .parents()
            .iter()
            .filter(|p| self.nodes.contains_key(p.as_str()))
            .cloned()
            .collect();
        if target.is_empty() {
            target.insert(ROOT_ID.to_string());
        }
        let current = self.parents_of(id).cloned().unwrap_or_default();

        for stale in current.difference(&target) {
            self.remove_edge(stale, id);
        }
        for fresh in target.difference(&current) {
            self.add_edge(fresh, id);
        }
    }

    /// Recompute execution depths after edges changed
    pub(crate) fn refresh_depths(&mut self) {
        let Ok(order) = self.topological_order(ROOT_ID) else {
            return;
        };
        for id in order.iter().filter(|id| id.as_str() != ROOT_ID) {
            let depth = self
                .parents_of(id)
                .map(|ps| {
                    ps.iter()
                        .filter_map(|p| self.nodes.get(p))
                        .map(Node::depth)
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            if let Some(node) = self.nodes.get_mut(id) {
                node.set_depth(depth + 1);
            }
        }
    }

    fn rename_edges(&mut self, old_id: &str, new_id: &str) {
        if let Some(parents) = self.parents.remove(old_id) {
            for parent in &parents {
                if let Some(children) = self.children.get_mut(parent) {
                    for child in children.iter_mut().filter(|c| c.as_str() == old_id) {
                        *child = new_id.to_string();
                    }
                }
            }
            self.parents.insert(new_id.to_string(), parents);
        }
        if let Some(children) = self.children.remove(old_id) {
            for child in &children {
                if let Some(parents) = self.parents.get_mut(child) {
                    parents.remove(old_id);
                    parents.insert(new_id.to_string());
                }
                if let Some(node) = self.nodes.get_mut(child) {
                    if node.parents_mut().remove(old_id) {
                        node.parents_mut().insert(new_id.to_string());
                    }
                }
            }
            self.children.insert(new_id.to_string(), children);
        }
        if let Some(seq) = self.sequence.remove(old_id) {
            self.sequence.insert(new_id.to_string(), seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphOptions;

    fn diamond() -> Graph {
        //   a
        //  / \
        // b   c
        //  \ /
        //   d
        let mut graph = Graph::new();
        graph.add_node(Node::new("a")).unwrap();
        graph.add_node(Node::new("b").with_parent("a")).unwrap();
        graph.add_node(Node::new("c").with_parent("a")).unwrap();
        graph
            .add_node(Node::new("d").with_parents(["b", "c"]))
            .unwrap();
        graph
    }

    fn edges(graph: &Graph) -> BTreeSet<(String, String)> {
        graph
            .node_ids()
            .into_iter()
            .flat_map(|id| {
                graph
                    .parents_of(id)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |p| (p, id.to_string()))
            })
            .collect()
    }

    #[test]
    fn test_add_node_rejects_duplicate() {
        let mut graph = diamond();
        let err = graph.add_node(Node::new("b")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateId(ref id) if id == "b"));
        let err = graph
            .add_node(Node::new("b").with_parent("d"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateId(_)));
    }

    #[test]
    fn test_add_node_rejects_missing_parent_and_separator() {
        let mut graph = Graph::new();
        let err = graph
            .add_node(Node::new("x").with_parent("nope"))
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingParent { ref parent, .. } if parent == "nope"));

        let err = graph.add_node(Node::new("x:y")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidId { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_nodes_any_order_matches_sequential() {
        let shuffled = vec![
            Node::new("d").with_parents(["b", "c"]),
            Node::new("c").with_parent("a"),
            Node::new("b").with_parent("a"),
            Node::new("a"),
        ];
        let mut graph = Graph::new();
        graph.add_nodes(shuffled).unwrap();

        let reference = diamond();
        assert_eq!(edges(&graph), edges(&reference));
        assert_eq!(graph.node("d").map(Node::depth), Some(3));
    }

    #[test]
    fn test_add_nodes_cycle_is_unresolvable() {
        let mut graph = Graph::new();
        let err = graph
            .add_nodes(vec![
                Node::new("ok"),
                Node::new("x").with_parent("y"),
                Node::new("y").with_parent("x"),
            ])
            .unwrap_err();
        match err {
            GraphError::UnresolvableDependency(ids) => {
                assert_eq!(ids, vec!["x".to_string(), "y".to_string()])
            }
            other => panic!("unexpected error {other:?}"),
        }
        // nothing inserted
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_nodes_duplicate_in_batch() {
        let mut graph = Graph::new();
        let err = graph
            .add_nodes(vec![Node::new("k"), Node::new("k").with_parent("k")])
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateId(_)));
    }

    #[test]
    fn test_delete_reparents_children() {
        let mut graph = diamond();
        graph.delete_node("b").unwrap();
        assert!(!graph.contains("b"));
        let d = graph.node("d").unwrap();
        assert_eq!(
            d.parents().iter().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "c".to_string()]
        );
        assert!(graph.children_of("a").contains(&"d".to_string()));
        assert_eq!(d.depth(), 3);
    }

    #[test]
    fn test_delete_root_child_moves_children_to_root() {
        let mut graph = diamond();
        graph.delete_node("a").unwrap();
        assert!(graph.node("b").unwrap().parents().is_empty());
        assert!(graph.children_of(ROOT_ID).contains(&"b".to_string()));
        assert_eq!(graph.node("b").map(Node::depth), Some(1));
        assert_eq!(graph.node("d").map(Node::depth), Some(2));
    }

    #[test]
    fn test_delete_then_reinsert_restores_structure() {
        let mut graph = diamond();
        let before = edges(&graph);
        graph.delete_node("d").unwrap();
        graph
            .add_node(Node::new("d").with_parents(["b", "c"]))
            .unwrap();
        assert_eq!(edges(&graph), before);
    }

    #[test]
    fn test_delete_reject_policy() {
        let mut graph = Graph::with_options(GraphOptions {
            delete_policy: DeletePolicy::Reject,
        });
        graph.add_node(Node::new("a")).unwrap();
        graph.add_node(Node::new("b").with_parent("a")).unwrap();
        let err = graph.delete_node("a").unwrap_err();
        assert!(matches!(err, GraphError::NodeHasChildren { .. }));
        assert!(graph.delete_node("b").is_ok());
        assert!(graph.delete_node("a").is_ok());
    }

    #[test]
    fn test_delete_detach_keeps_dangling_declaration() {
        let mut graph = Graph::with_options(GraphOptions {
            delete_policy: DeletePolicy::Detach,
        });
        graph.add_node(Node::new("a")).unwrap();
        graph.add_node(Node::new("b").with_parent("a")).unwrap();
        graph.delete_node("a").unwrap();
        assert!(graph.node("b").unwrap().parents().contains("a"));
        assert!(graph.children_of(ROOT_ID).contains(&"b".to_string()));
    }

    #[test]
    fn test_delete_missing_and_root() {
        let mut graph = diamond();
        assert!(matches!(
            graph.delete_node("zz"),
            Err(GraphError::NodeNotFound(_))
        ));
        assert!(graph.delete_node(ROOT_ID).is_err());
    }

    #[test]
    fn test_replace_keeps_edges() {
        let mut graph = diamond();
        let old = graph
            .replace_node("b", Node::new("b").with_parent("c"))
            .unwrap();
        assert_eq!(old.id(), "b");
        let b = graph.node("b").unwrap();
        assert!(b.parents().contains("a"));
        assert!(!b.parents().contains("c"));
    }

    #[test]
    fn test_replace_with_rename() {
        let mut graph = diamond();
        graph.replace_node("b", Node::new("b2")).unwrap();
        assert!(!graph.contains("b"));
        assert!(graph.contains("b2"));
        assert!(graph.node("d").unwrap().parents().contains("b2"));
        assert!(graph.children_of("a").contains(&"b2".to_string()));
        assert_eq!(graph.topological_order("b2").unwrap(), vec!["b2", "d"]);
    }

    #[test]
    fn test_replace_errors() {
        let mut graph = diamond();
        assert!(matches!(
            graph.replace_node("zz", Node::new("zz")),
            Err(GraphError::NodeNotFound(_))
        ));
        assert!(matches!(
            graph.replace_node("b", Node::new("c")),
            Err(GraphError::DuplicateId(_))
        ));
        assert!(matches!(
            graph.replace_node("b", Node::new("b:x")),
            Err(GraphError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_remove_branch() {
        let mut graph = diamond();
        let removed = graph.remove_branch("b").unwrap();
        assert_eq!(removed, vec!["b", "d"]);
        assert_eq!(graph.node_ids(), vec!["a", "c"]);
    }

    #[test]
    fn test_sub_graph() {
        let graph = diamond();
        let sub = graph.sub_graph("b", &[]).unwrap();
        assert_eq!(sub.node_ids(), vec!["b", "d"]);
        // parent outside of the copy dropped
        assert!(sub.node("b").unwrap().parents().is_empty());
        assert_eq!(
            sub.node("d").unwrap().parents().iter().collect::<Vec<_>>(),
            vec!["b"]
        );

        let bounded = graph.sub_graph("a", &["b"]).unwrap();
        assert_eq!(bounded.len(), 4);
        let only_a = graph.sub_graph("a", &["a"]).unwrap();
        assert_eq!(only_a.node_ids(), vec!["a"]);

        assert!(graph.sub_graph("zz", &[]).is_err());
        assert!(graph.sub_graph("a", &["zz"]).is_err());
    }

    #[test]
    fn test_sub_graph_reports_cut_parents() {
        let graph = diamond();
        let (sub, removed) = graph.sub_graph_with_removed("b", &[]).unwrap();
        assert_eq!(sub.node_ids(), vec!["b", "d"]);
        assert_eq!(
            removed,
            vec![
                ("b".to_string(), BTreeSet::from(["a".to_string()])),
                ("d".to_string(), BTreeSet::from(["c".to_string()])),
            ]
        );

        let (_, removed) = graph.sub_graph_with_removed("a", &[]).unwrap();
        assert!(removed.is_empty());
    }
}
