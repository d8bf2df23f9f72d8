//! Progress reporting during traversal
//!
//! Sinks are notified synchronously after each dispatched node.

/// One "done of total" update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent<'a> {
    /// Name of the visitor (or composition) being run
    pub visitor: &'a str,
    pub node_id: &'a str,
    pub done: usize,
    pub total: usize,
    /// Graph node nesting depth, 0 for the top level graph
    pub depth: usize,
}

/// Receiver of progress updates
pub trait ProgressSink {
    fn update(&mut self, event: &ProgressEvent<'_>);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent<'_>),
{
    fn update(&mut self, event: &ProgressEvent<'_>) {
        self(event)
    }
}

/// Default sink writing through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&mut self, event: &ProgressEvent<'_>) {
        if event.depth == 0 {
            log::info!(
                "{}: {}/{} (node {})",
                event.visitor,
                event.done,
                event.total,
                event.node_id
            );
        } else {
            log::debug!(
                "{} [depth {}]: {}/{} (node {})",
                event.visitor,
                event.depth,
                event.done,
                event.total,
                event.node_id
            );
        }
    }
}
