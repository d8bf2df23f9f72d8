// SPDX-License-Identifier: MIT

//! Execution graph
//!
//! This module provides the node model, the graph store with its builder
//! operations, and the fork engine.

mod builder;
mod fork;
pub mod id;
mod node;
mod store;

pub use id::{qualify, validate_id, ROOT_ID, SEPARATOR};
pub use node::{Node, NodeKind, Task};
pub use store::Graph;
