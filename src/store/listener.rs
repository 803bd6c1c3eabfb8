use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

type Reaction<S> = dyn Fn(&S) -> Option<BoxFuture<'static, ()>> + Send + Sync;

/// Reaction to store changes.
///
/// Clones share identity; [`Store::off`](crate::Store::off) finds
/// registrations by that identity.
pub struct StoreListener<S> {
    func: Arc<Reaction<S>>,
}

impl<S: 'static> StoreListener<S> {
    /// Listener that finishes its work synchronously.
    pub fn new(f: impl Fn(&S) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(move |state: &S| {
                f(state);
                None
            }),
        }
    }

    /// Listener whose work completes later.
    ///
    /// `f` runs synchronously during notification; the future it returns is
    /// driven by the [`Notified`](crate::Notified) signal of the commit.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(&S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            func: Arc::new(move |state: &S| Some(f(state).boxed())),
        }
    }

    pub(crate) fn call(&self, state: &S) -> Option<BoxFuture<'static, ()>> {
        (self.func)(state)
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.func) as *const () as usize
    }
}

impl<S> Clone for StoreListener<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<S: 'static> PartialEq for StoreListener<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<S> fmt::Debug for StoreListener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreListener").finish_non_exhaustive()
    }
}
