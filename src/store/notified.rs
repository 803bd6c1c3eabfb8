//! Completion signal of a store notification.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture};
use futures::FutureExt;

/// Resolves once every deferred listener result of one notification settled.
///
/// Returned by every store mutation. Synchronous listeners have already run
/// when it is returned; deferred work only progresses while it is polled, and
/// dropping it abandons that work.
pub struct Notified {
    pending: Option<BoxFuture<'static, ()>>,
}

impl Notified {
    /// A signal with nothing to wait for.
    pub(crate) fn ready() -> Self {
        Self { pending: None }
    }

    pub(crate) fn from_deferred(mut deferred: Vec<BoxFuture<'static, ()>>) -> Self {
        let pending = match deferred.len() {
            0 => None,
            1 => deferred.pop(),
            _ => Some(future::join_all(deferred).map(|_| ()).boxed()),
        };
        Self { pending }
    }

    /// Returns `true` if no listener deferred any work.
    pub fn is_ready(&self) -> bool {
        self.pending.is_none()
    }
}

impl Future for Notified {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(());
        };
        match pending.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.pending = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for Notified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notified")
            .field("ready", &self.is_ready())
            .finish()
    }
}
