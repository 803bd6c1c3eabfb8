//! # Failure reporting for listeners and teardown.
//!
//! Listener panics inside [`EventBus::emit`](crate::EventBus::emit), store
//! notification and deferred store reactions are caught at the call site and
//! turned into a [`Failure`]. The failure is handed to a [`FailureHandler`];
//! dispatch then continues with the next listener.
//!
//! ## Rules
//! - **Never propagates**: `emit`, notify and `remove_listeners` return normally.
//! - **Pluggable**: each bus/store holds an `Arc<dyn FailureHandler>`.
//! - **Default**: [`LogFailures`] writes a `tracing` error event.

use std::fmt;
use std::sync::Arc;

/// Stage at which a listener failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Event bus listener invoked by `emit`.
    Emit,
    /// Store listener invoked synchronously after a commit.
    Notify,
    /// Deferred result returned by a store listener.
    Deferred,
    /// Disposable torn down by `destroy_all`.
    Destroy,
}

impl Stage {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Stage::Emit => "emit",
            Stage::Notify => "notify",
            Stage::Deferred => "deferred",
            Stage::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A contained listener failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Where it happened.
    pub stage: Stage,
    /// What failed: event tag, store state type or bean name.
    pub subject: Arc<str>,
    /// Panic or error message.
    pub message: String,
}

impl Failure {
    /// Creates a failure record.
    pub fn new(stage: Stage, subject: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.message)
    }
}

/// Sink for contained listener failures.
///
/// ### Implementation requirements
/// - Must not panic.
/// - Must not emit on the bus that reported the failure with the same tag
///   (it would recurse for a listener that always fails).
pub trait FailureHandler: Send + Sync + 'static {
    /// Receives one failure.
    fn on_failure(&self, failure: &Failure);
}

/// Default [`FailureHandler`]: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailures;

impl FailureHandler for LogFailures {
    fn on_failure(&self, failure: &Failure) {
        tracing::error!(
            stage = failure.stage.as_label(),
            subject = %failure.subject,
            message = %failure.message,
            "listener failed"
        );
    }
}

/// Returns the shared default handler.
pub(crate) fn default_handler() -> Arc<dyn FailureHandler> {
    Arc::new(LogFailures)
}
