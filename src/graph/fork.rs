// SPDX-License-Identifier: MIT

//! Fork engine
//!
//! Duplicates the region downstream of a source node under qualified ids
//! (`original::fork_id`). The copy is a sibling branch of the source; when a
//! join node is given, the copy stops before it and feeds into it.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::error::GraphError;
use crate::graph::id::{qualify, validate_id, ROOT_ID};
use crate::graph::node::{Node, NodeKind};
use crate::graph::store::Graph;

impl Graph {
    /// Fork the region starting at `source_id`.
    ///
    /// Without a join the whole downstream closure of the source is copied.
    /// With a join only the nodes between the source and the join are copied;
    /// every one of them must lead to the join and nowhere else.
    ///
    /// Returns the ids of the created nodes, in insertion order.
    pub fn fork_from_node(
        &mut self,
        source_id: &str,
        fork_id: &str,
        join_id: Option<&str>,
    ) -> Result<Vec<String>, GraphError> {
        self.fork(source_id, fork_id, join_id, None)
    }

    /// Same as [`Graph::fork_from_node`], but the duplicate of the source
    /// carries `head` instead of a copy of the source's payload.
    ///
    /// The duplicate keeps its qualified id, fork id and parents; only the
    /// kind differs, so each branch of a map-reduce style fork can run its
    /// own task.
    pub fn fork_from_node_with(
        &mut self,
        source_id: &str,
        fork_id: &str,
        join_id: Option<&str>,
        head: NodeKind,
    ) -> Result<Vec<String>, GraphError> {
        if matches!(head, NodeKind::Root) {
            return Err(GraphError::invalid_fork("a fork head cannot be a root node"));
        }
        self.fork(source_id, fork_id, join_id, Some(head))
    }

    fn fork(
        &mut self,
        source_id: &str,
        fork_id: &str,
        join_id: Option<&str>,
        mut head: Option<NodeKind>,
    ) -> Result<Vec<String>, GraphError> {
        validate_id(fork_id)?;
        if source_id == ROOT_ID {
            return Err(GraphError::invalid_fork("the root node cannot be forked"));
        }
        if !self.contains(source_id) {
            return Err(GraphError::invalid_fork(format!(
                "source node '{}' is not in the execution graph",
                source_id
            )));
        }

        let region = self.fork_region(source_id, join_id)?;
        let order: Vec<String> = self
            .topological_order(source_id)?
            .into_iter()
            .filter(|id| region.contains(id))
            .collect();

        if let Some(join) = join_id {
            for id in &order {
                if let Some(target) = self
                    .children_of(id)
                    .iter()
                    .find(|c| c.as_str() != join && !region.contains(*c))
                {
                    return Err(GraphError::AmbiguousJoin {
                        join: join.to_string(),
                        node: id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        if let Some(taken) = order
            .iter()
            .map(|id| qualify(id, fork_id))
            .find(|q| self.contains(q))
        {
            return Err(GraphError::DuplicateId(taken));
        }

        let duplicates: Vec<Node> = order
            .iter()
            .filter_map(|id| self.node(id))
            .map(|original| {
                let mut duplicate = original.clone();
                if original.id() == source_id {
                    if let Some(kind) = head.take() {
                        duplicate.set_kind(kind);
                    }
                }
                duplicate.set_id(qualify(original.id(), fork_id));
                duplicate.set_fork_id(Some(fork_id.to_string()));
                *duplicate.parents_mut() = original
                    .parents()
                    .iter()
                    .map(|p| {
                        if region.contains(p) {
                            qualify(p, fork_id)
                        } else {
                            p.clone()
                        }
                    })
                    .collect();
                duplicate
            })
            .collect();

        let created: Vec<String> = duplicates.iter().map(|n| n.id().to_string()).collect();
        for duplicate in duplicates {
            self.attach(duplicate);
        }

        if let Some(join) = join_id {
            let feeding: Vec<String> = self
                .parents_of(join)
                .map(|ps| ps.iter().filter(|p| region.contains(*p)).cloned().collect())
                .unwrap_or_default();
            for parent in feeding {
                let duplicate = qualify(&parent, fork_id);
                if let Some(join_node) = self.nodes.get_mut(join) {
                    join_node.parents_mut().insert(duplicate.clone());
                }
                self.add_edge(&duplicate, join);
            }
            self.refresh_depths();
        }

        log::info!(
            "Forked '{}' as '{}'{}: {} nodes duplicated",
            source_id,
            fork_id,
            join_id
                .map(|j| format!(" joining on '{}'", j))
                .unwrap_or_default(),
            created.len()
        );
        Ok(created)
    }

    /// Nodes to duplicate for a fork of `source_id`
    fn fork_region(
        &self,
        source_id: &str,
        join_id: Option<&str>,
    ) -> Result<HashSet<String>, GraphError> {
        let Some(join) = join_id else {
            return self.reachable_from(source_id, None);
        };

        if !self.contains(join) {
            return Err(GraphError::invalid_fork(format!(
                "join node '{}' is not in the execution graph",
                join
            )));
        }
        if join == source_id {
            return Err(GraphError::invalid_fork(format!(
                "node '{}' cannot be both source and join",
                join
            )));
        }

        let downstream = self.reachable_from(source_id, Some(join))?;
        let upstream = self.ancestors_of(join);
        if !upstream.contains(source_id) {
            return Err(GraphError::invalid_fork(format!(
                "join node '{}' is not reachable from '{}'",
                join, source_id
            )));
        }

        Ok(downstream
            .into_iter()
            .filter(|id| upstream.contains(id))
            .collect())
    }

    /// Every node `id` depends on, directly or not
    fn ancestors_of(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<String> = self
            .parents_of(id)
            .cloned()
            .unwrap_or_else(BTreeSet::new)
            .into_iter()
            .collect();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.parents_of(&current) {
                queue.extend(parents.iter().cloned());
            }
        }
        seen
    }
}
