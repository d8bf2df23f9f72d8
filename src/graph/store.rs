// SPDX-License-Identifier: MIT

//! Graph store
//!
//! Owns the nodes, the synthetic root, and both directions of the adjacency.
//! Mutations live in `builder` and `fork`; this module holds the queries and
//! the low level wiring they share.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::config::GraphOptions;
use crate::error::GraphError;
use crate::graph::id::ROOT_ID;
use crate::graph::node::Node;

/// Execution graph
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: HashMap<String, Node>,
    /// parent id -> children ids, in insertion order
    pub(crate) children: HashMap<String, Vec<String>>,
    /// child id -> effective parent ids (the root for parentless nodes)
    pub(crate) parents: HashMap<String, BTreeSet<String>>,
    /// insertion sequence, used to break ties in topological order
    pub(crate) sequence: HashMap<String, u64>,
    next_sequence: u64,
    pub(crate) options: GraphOptions,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create an empty graph holding only the root node
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    pub fn with_options(options: GraphOptions) -> Self {
        let mut graph = Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
            parents: HashMap::new(),
            sequence: HashMap::new(),
            next_sequence: 0,
            options,
        };
        graph.parents.insert(ROOT_ID.to_string(), BTreeSet::new());
        graph.sequence.insert(ROOT_ID.to_string(), 0);
        graph.next_sequence = 1;
        graph.nodes.insert(ROOT_ID.to_string(), Node::root());
        graph
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_ID]
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all nodes except the root, in insertion order
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<(&u64, &str)> = self
            .sequence
            .iter()
            .filter(|(id, _)| id.as_str() != ROOT_ID)
            .map(|(id, seq)| (seq, id.as_str()))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Children of a node, in insertion order
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Effective parents of a node (the root for parentless nodes)
    pub fn parents_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.parents.get(id)
    }

    /// Nodes depending on `id`
    pub fn successors(&self, id: &str) -> Vec<&Node> {
        self.children_of(id)
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .collect()
    }

    /// Nodes `id` depends on, the root included
    pub fn predecessors(&self, id: &str) -> Vec<&Node> {
        self.parents_of(id)
            .map(|ps| ps.iter().filter_map(|p| self.nodes.get(p)).collect())
            .unwrap_or_default()
    }

    /// All nodes reachable from `start` (inclusive), never crossing `stop`
    pub fn reachable_from(
        &self,
        start: &str,
        stop: Option<&str>,
    ) -> Result<HashSet<String>, GraphError> {
        if !self.contains(start) {
            return Err(GraphError::NodeNotFound(start.to_string()));
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(id) = queue.pop_front() {
            if Some(id.as_str()) == stop || !seen.insert(id.clone()) {
                continue;
            }
            queue.extend(self.children_of(&id).iter().cloned());
        }
        Ok(seen)
    }

    /// Topological order of the descendants of `start` (inclusive).
    ///
    /// Kahn's algorithm restricted to the descendants; among ready nodes the
    /// one inserted first comes first.
    pub fn topological_order(&self, start: &str) -> Result<Vec<String>, GraphError> {
        let members = self.reachable_from(start, None)?;

        let mut in_degree: HashMap<&str, usize> = members
            .iter()
            .map(|id| {
                let degree = self
                    .parents_of(id)
                    .map(|ps| ps.iter().filter(|p| members.contains(*p)).count())
                    .unwrap_or(0);
                (id.as_str(), degree)
            })
            .collect();
        // the start node may have in-set parents only if the graph is cyclic
        in_degree.insert(start, 0);

        let mut ready: BTreeSet<(u64, &str)> = BTreeSet::from([(self.sequence_of(start), start)]);
        let mut sorted = Vec::with_capacity(members.len());

        while let Some(entry) = ready.pop_first() {
            let id = entry.1;
            sorted.push(id.to_string());
            for child in self.children_of(id) {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert((self.sequence_of(child), child.as_str()));
                    }
                }
            }
        }

        if sorted.len() != members.len() {
            log::warn!(
                "Topological order from '{}' covers {} of {} nodes, graph is not acyclic",
                start,
                sorted.len(),
                members.len()
            );
        }
        Ok(sorted)
    }

    fn sequence_of(&self, id: &str) -> u64 {
        self.sequence.get(id).copied().unwrap_or(u64::MAX)
    }

    /// Register a node and wire it to its declared parents (or the root).
    ///
    /// Callers have already validated id and parents.
    pub(crate) fn attach(&mut self, mut node: Node) {
        let id = node.id().to_string();
        let effective: BTreeSet<String> = if node.parents().is_empty() {
            BTreeSet::from([ROOT_ID.to_string()])
        } else {
            node.parents().clone()
        };

        let depth = effective
            .iter()
            .filter_map(|p| self.nodes.get(p))
            .map(Node::depth)
            .max()
            .unwrap_or(0);
        node.set_depth(depth + 1);

        for parent in &effective {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(id.clone());
        }
        self.parents.insert(id.clone(), effective);
        self.sequence.insert(id.clone(), self.next_sequence);
        self.next_sequence += 1;
        self.nodes.insert(id, node);
    }

    pub(crate) fn add_edge(&mut self, parent: &str, child: &str) {
        let children = self.children.entry(parent.to_string()).or_default();
        if !children.iter().any(|c| c == child) {
            children.push(child.to_string());
        }
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }

    pub(crate) fn remove_edge(&mut self, parent: &str, child: &str) {
        if let Some(children) = self.children.get_mut(parent) {
            children.retain(|c| c != child);
        }
        if let Some(parents) = self.parents.get_mut(child) {
            parents.remove(parent);
        }
    }

    /// Drop a node and every edge touching it; children are left as they are.
    pub(crate) fn detach(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        for parent in self.parents.remove(id).unwrap_or_default() {
            if let Some(children) = self.children.get_mut(&parent) {
                children.retain(|c| c != id);
            }
        }
        for child in self.children.remove(id).unwrap_or_default() {
            if let Some(parents) = self.parents.get_mut(&child) {
                parents.remove(id);
            }
        }
        self.sequence.remove(id);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph.attach(Node::new("a"));
        graph.attach(Node::new("b").with_parent("a"));
        graph.attach(Node::new("c").with_parent("b"));
        graph
    }

    #[test]
    fn test_new_graph_has_only_root() {
        let graph = Graph::new();
        assert!(graph.is_empty());
        assert!(graph.root().is_root());
        assert!(graph.contains(ROOT_ID));
        assert_eq!(graph.root().depth(), 0);
    }

    #[test]
    fn test_attach_wires_root_and_depth() {
        let graph = chain();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.children_of(ROOT_ID), &["a".to_string()]);
        assert_eq!(graph.node("a").map(Node::depth), Some(1));
        assert_eq!(graph.node("c").map(Node::depth), Some(3));
        assert_eq!(graph.predecessors("b")[0].id(), "a");
        assert_eq!(graph.successors("b")[0].id(), "c");
    }

    #[test]
    fn test_reachable_with_stop() {
        let graph = chain();
        let all = graph.reachable_from("a", None).unwrap();
        assert_eq!(all.len(), 3);
        let bounded = graph.reachable_from("a", Some("c")).unwrap();
        assert!(bounded.contains("b"));
        assert!(!bounded.contains("c"));
        assert!(graph.reachable_from("zz", None).is_err());
    }

    #[test]
    fn test_topological_order_uses_insertion_order_for_ties() {
        let mut graph = Graph::new();
        graph.attach(Node::new("z"));
        graph.attach(Node::new("a"));
        graph.attach(Node::new("m").with_parents(["z", "a"]));
        let order = graph.topological_order(ROOT_ID).unwrap();
        assert_eq!(order, vec![ROOT_ID, "z", "a", "m"]);

        let from_a = graph.topological_order("a").unwrap();
        assert_eq!(from_a, vec!["a", "m"]);
    }

    #[test]
    fn test_detach_removes_edges() {
        let mut graph = chain();
        let removed = graph.detach("b");
        assert!(removed.is_some());
        assert!(graph.children_of("a").is_empty());
        assert!(graph.parents_of("c").map(|p| p.is_empty()).unwrap_or(false));
        assert_eq!(graph.node_ids(), vec!["a", "c"]);
    }
}
