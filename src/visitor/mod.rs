// SPDX-License-Identifier: MIT

//! Graph visitors
//!
//! This module provides the visitor contract, the traversal engine, the
//! composer and the standard visitors.

mod composer;
mod core;
mod engine;
mod progress;
mod standard;

pub use self::core::{NodeRef, VisitResult, Visitor, VisitorState};
pub use composer::VisitorComposer;
pub use engine::traverse;
pub use progress::{LogProgress, ProgressEvent, ProgressSink};
pub use standard::{FindAllVisitor, FindFirstVisitor, LengthVisitor, ValidateGraphIntegrity};
