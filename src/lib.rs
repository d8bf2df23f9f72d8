// SPDX-License-Identifier: MIT

//! Execution graphs of user-defined nodes, traversed by composable visitors.

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod visitor;

pub use config::{DeletePolicy, GraphOptions, Settings, VisitOptions};
pub use error::{ExecGraphError, GraphError, IntegrityError, IntegrityViolation, TaskError};
pub use graph::{Graph, Node, NodeKind, Task};
pub use loader::GraphLoader;
pub use visitor::{NodeRef, VisitResult, Visitor, VisitorComposer, VisitorState};
