//! # Reactive store.
//!
//! [`Store<S>`] holds an immutable snapshot `Arc<S>` and replaces it on every
//! committed mutation, then notifies its listeners.
//!
//! ## Architecture
//! ```text
//! commit(mutation)
//!     │
//!     ├──► next = state.clone() ──► mutation(&mut next) ──► Change::Unchanged ──► state = next, Notified (ready)
//!     │                                                 └─► Change::Changed
//!     ├──► before_apply(&mut next)
//!     ├──► state = Arc::new(next)
//!     └──► notify(state)
//!              ├──► listener 0 ──► sync              (panic → FailureHandler, Notify)
//!              ├──► listener 1 ──► deferred future   (panic → FailureHandler, Deferred)
//!              └──► Notified = ready | single future | join_all
//! ```
//!
//! ## Rules
//! - No lock is held while a mutation, hook or listener runs.
//! - Listeners run in registration order; one registered during a pass is
//!   not called by it, one destroyed before its turn is skipped.
//! - `state()` always returns a complete snapshot; mutations never touch a
//!   snapshot a caller already holds.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use super::binding::StoreBinding;
use super::change::Change;
use super::listener::StoreListener;
use super::notified::Notified;
use super::patch::{Merge, Patch};
use crate::error::panic_message;
use crate::events::{same_target, Target};
use crate::lifecycle::{default_handler, Failure, FailureHandler, Stage};

type BeforeApply<S> = Box<dyn Fn(&mut S) + Send + Sync>;

/// What a mutation did to the copied state.
enum Apply {
    /// Nothing to store.
    Skip,
    /// Store without notifying.
    Silent,
    /// Store, run `before_apply`, notify.
    Publish,
}

struct Registration<S> {
    id: u64,
    listener: StoreListener<S>,
    target: Option<Target>,
    active: Arc<AtomicBool>,
}

pub(crate) struct StoreInner<S> {
    state: Mutex<Arc<S>>,
    listeners: Mutex<Vec<Registration<S>>>,
    before_apply: Option<BeforeApply<S>>,
    handler: Arc<dyn FailureHandler>,
    subject: Arc<str>,
    next_id: AtomicU64,
}

impl<S> StoreInner<S> {
    pub(crate) fn remove_by_id(&self, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(pos) = listeners.iter().position(|r| r.id == id) {
            listeners.remove(pos);
        }
    }
}

/// Mutable state container with change notification.
///
/// Cheap to clone; clones share state and listeners.
///
/// # Example
/// ```rust
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use beanwire::{Store, StoreListener};
///
/// #[derive(Clone, Default)]
/// struct Counter {
///     count: u32,
/// }
///
/// let store = Store::new(Counter::default());
/// let seen = Arc::new(AtomicU32::new(0));
/// let sink = Arc::clone(&seen);
/// store.on(StoreListener::new(move |s: &Counter| sink.store(s.count, Ordering::SeqCst)));
///
/// let _ = store.set(|s| &mut s.count, 3);
/// assert_eq!(seen.load(Ordering::SeqCst), 3);
/// assert_eq!(store.state().count, 3);
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    /// Creates a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    /// Starts configuring a store holding `initial`.
    pub fn builder(initial: S) -> StoreBuilder<S> {
        StoreBuilder {
            initial,
            before_apply: None,
            handler: None,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&*self.inner.state.lock())
    }

    /// Assigns `value` to the field selected by `field`.
    ///
    /// Nothing happens (and nobody is notified) when the field already equals `value`.
    pub fn set<V, F>(&self, field: F, value: V) -> Notified
    where
        V: PartialEq,
        F: FnOnce(&mut S) -> &mut V,
    {
        self.apply(move |state| {
            let slot = field(state);
            if *slot == value {
                return Apply::Skip;
            }
            *slot = value;
            Apply::Publish
        })
    }

    /// Merges a partial value into the state.
    pub fn patch<P>(&self, patch: Patch<S, P>) -> Notified
    where
        S: Merge<P>,
    {
        self.apply(move |state| {
            let values = match patch {
                Patch::Values(values) => values,
                Patch::Pick(pick) => match pick(&*state) {
                    Some(values) => values,
                    None => return Apply::Skip,
                },
            };
            state.merge(values);
            Apply::Publish
        })
    }

    /// Applies `mutation` to a copy of the state and publishes it.
    ///
    /// Returning `false` from the mutation keeps the change but notifies
    /// nobody and skips `before_apply`; returning `()` or `true` publishes.
    pub fn commit<C, F>(&self, mutation: F) -> Notified
    where
        C: Into<Change>,
        F: FnOnce(&mut S) -> C,
    {
        self.apply(move |state| match mutation(state).into() {
            Change::Changed => Apply::Publish,
            Change::Unchanged => Apply::Silent,
        })
    }

    /// Applies `mutation` to the field selected by `field`.
    pub fn commit_key<V, C, K, F>(&self, field: K, mutation: F) -> Notified
    where
        C: Into<Change>,
        K: FnOnce(&mut S) -> &mut V,
        F: FnOnce(&mut V) -> C,
    {
        self.commit(move |state| mutation(field(state)))
    }

    /// Registers `listener`.
    pub fn on(&self, listener: StoreListener<S>) -> StoreBinding<S> {
        self.subscribe(listener, None)
    }

    /// Registers `listener` under `target`; the pair identifies it for [`off`](Self::off).
    pub fn on_target(&self, listener: StoreListener<S>, target: &Target) -> StoreBinding<S> {
        self.subscribe(listener, Some(target.clone()))
    }

    /// Removes the first registration of `listener` made with exactly `target`.
    pub fn off(&self, listener: &StoreListener<S>, target: Option<&Target>) {
        let removed = {
            let mut listeners = self.inner.listeners.lock();
            let pos = listeners
                .iter()
                .position(|r| r.listener == *listener && same_target(r.target.as_ref(), target));
            pos.map(|pos| listeners.remove(pos))
        };
        if let Some(registration) = removed {
            registration.active.store(false, Ordering::Release);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn apply<F>(&self, mutation: F) -> Notified
    where
        F: FnOnce(&mut S) -> Apply,
    {
        let mut next = S::clone(&**self.inner.state.lock());
        match mutation(&mut next) {
            Apply::Skip => Notified::ready(),
            Apply::Silent => {
                tracing::trace!(store = %self.inner.subject, "silent commit");
                *self.inner.state.lock() = Arc::new(next);
                Notified::ready()
            }
            Apply::Publish => {
                if let Some(hook) = &self.inner.before_apply {
                    hook(&mut next);
                }
                let snapshot = Arc::new(next);
                *self.inner.state.lock() = Arc::clone(&snapshot);
                self.notify(&snapshot)
            }
        }
    }

    fn subscribe(&self, listener: StoreListener<S>, target: Option<Target>) -> StoreBinding<S> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.inner.listeners.lock().push(Registration {
            id,
            listener,
            target,
            active: Arc::clone(&active),
        });
        StoreBinding::new(Arc::downgrade(&self.inner), id, active)
    }

    fn notify(&self, state: &Arc<S>) -> Notified {
        let pass: Vec<(StoreListener<S>, Arc<AtomicBool>)> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|r| (r.listener.clone(), Arc::clone(&r.active)))
            .collect();
        tracing::trace!(store = %self.inner.subject, listeners = pass.len(), "notify");

        let mut deferred: Vec<BoxFuture<'static, ()>> = Vec::new();
        for (listener, active) in pass {
            if !active.load(Ordering::Acquire) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| listener.call(state))) {
                Ok(Some(work)) => deferred.push(self.guard_deferred(work)),
                Ok(None) => {}
                Err(panic) => self.report(Stage::Notify, panic_message(panic.as_ref())),
            }
        }
        Notified::from_deferred(deferred)
    }

    fn guard_deferred(&self, work: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
        let handler = Arc::clone(&self.inner.handler);
        let subject = Arc::clone(&self.inner.subject);
        AssertUnwindSafe(work)
            .catch_unwind()
            .map(move |result| {
                if let Err(panic) = result {
                    let failure = Failure::new(Stage::Deferred, subject, panic_message(panic.as_ref()));
                    handler.on_failure(&failure);
                }
            })
            .boxed()
    }

    fn report(&self, stage: Stage, message: String) {
        let failure = Failure::new(stage, Arc::clone(&self.inner.subject), message);
        self.inner.handler.on_failure(&failure);
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone + Default + Send + Sync + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.lock())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

/// Builder for a [`Store`] with optional hooks.
pub struct StoreBuilder<S> {
    initial: S,
    before_apply: Option<BeforeApply<S>>,
    handler: Option<Arc<dyn FailureHandler>>,
}

impl<S: Clone + Send + Sync + 'static> StoreBuilder<S> {
    /// Post-processes every committed state before it is published.
    pub fn before_apply(mut self, hook: impl Fn(&mut S) + Send + Sync + 'static) -> Self {
        self.before_apply = Some(Box::new(hook));
        self
    }

    /// Reports listener failures to `handler` instead of the log.
    pub fn with_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Builds the store.
    pub fn build(self) -> Store<S> {
        Store {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(self.initial)),
                listeners: Mutex::new(Vec::new()),
                before_apply: self.before_apply,
                handler: self.handler.unwrap_or_else(default_handler),
                subject: Arc::from(std::any::type_name::<S>()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;

    use super::*;
    use crate::lifecycle::testing::Collect;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter {
        count: u32,
        label: String,
    }

    struct CounterPatch {
        count: Option<u32>,
        label: Option<String>,
    }

    impl Merge<CounterPatch> for Counter {
        fn merge(&mut self, patch: CounterPatch) {
            if let Some(count) = patch.count {
                self.count = count;
            }
            if let Some(label) = patch.label {
                self.label = label;
            }
        }
    }

    fn counting(store: &Store<Counter>) -> (Arc<AtomicUsize>, Arc<Mutex<Vec<u32>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (c, s) = (Arc::clone(&calls), Arc::clone(&seen));
        store.on(StoreListener::new(move |state: &Counter| {
            c.fetch_add(1, Ordering::SeqCst);
            s.lock().push(state.count);
        }));
        (calls, seen)
    }

    #[test]
    fn test_set_same_value_does_not_notify() {
        let store = Store::new(Counter::default());
        let (calls, _) = counting(&store);
        let before = store.state();

        let notified = store.set(|s| &mut s.count, 0);
        assert!(notified.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn test_set_new_value_notifies_once() {
        let store = Store::new(Counter::default());
        let (first, seen_a) = counting(&store);
        let (second, seen_b) = counting(&store);

        let _ = store.set(|s| &mut s.count, 1);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(*seen_a.lock(), vec![1]);
        assert_eq!(*seen_b.lock(), vec![1]);
        assert_eq!(store.state().count, 1);
    }

    #[test]
    fn test_commit_false_keeps_write_without_notifying() {
        let store = Store::new(Counter::default());
        let (calls, _) = counting(&store);

        let notified = store.commit(|s| {
            s.count = 10;
            false
        });
        assert!(notified.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.state().count, 10);

        let _ = store.commit(|s| s.count += 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().count, 12);
    }

    #[test]
    fn test_silent_commit_key_keeps_write_and_skips_hook() {
        let store = Store::builder(Counter::default())
            .before_apply(|s| s.label.push('!'))
            .build();
        let (calls, _) = counting(&store);

        let _ = store.commit_key(|s| &mut s.label, |label| {
            label.push_str("draft");
            false
        });
        assert_eq!(store.state().label, "draft");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _ = store.commit_key(|s| &mut s.count, |count| *count += 1);
        assert_eq!(store.state().label, "draft!");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_commit_key_mutates_slice() {
        let store = Store::new(Counter::default());
        let (calls, _) = counting(&store);
        let _ = store.commit_key(|s| &mut s.label, |label| label.push_str("hi"));
        let _ = store.commit_key(|s| &mut s.count, |_| false);
        assert_eq!(store.state().label, "hi");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_patch_values_and_pick() {
        let store = Store::new(Counter::default());
        let (calls, _) = counting(&store);

        let _ = store.patch(Patch::Values(CounterPatch {
            count: None,
            label: Some("x".into()),
        }));
        let _ = store.patch(Patch::pick(|prev: &Counter| {
            Some(CounterPatch {
                count: Some(prev.count + 5),
                label: None,
            })
        }));
        let _ = store.patch(Patch::<Counter, CounterPatch>::pick(|_| None));

        assert_eq!(
            *store.state(),
            Counter {
                count: 5,
                label: "x".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_patch_with_whole_state_replaces() {
        let store = Store::new(Counter::default());
        let _ = store.patch(Patch::Values(Counter {
            count: 9,
            label: "all".into(),
        }));
        assert_eq!(store.state().count, 9);
    }

    #[test]
    fn test_snapshots_are_not_mutated() {
        let store = Store::new(Counter::default());
        let old = store.state();
        let _ = store.set(|s| &mut s.count, 4);
        assert_eq!(old.count, 0);
        assert_eq!(store.state().count, 4);
    }

    #[test]
    fn test_before_apply_post_processes() {
        let store = Store::builder(Counter::default())
            .before_apply(|s| s.count = s.count.min(10))
            .build();
        let _ = store.set(|s| &mut s.count, 99);
        assert_eq!(store.state().count, 10);
    }

    #[test]
    fn test_off_removes_first_match_only() {
        let store = Store::new(Counter::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let listener = StoreListener::new(move |_: &Counter| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let target = Target::new(());
        let first = store.on(listener.clone());
        store.on(listener.clone());
        store.on_target(listener.clone(), &target);

        store.off(&listener, None);
        assert!(!first.is_active());
        assert_eq!(store.listener_count(), 2);

        let _ = store.set(|s| &mut s.count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        store.off(&listener, Some(&target));
        store.off(&listener, Some(&target));
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_binding_destroy_is_one_way() {
        let store = Store::new(Counter::default());
        let binding = store.on(StoreListener::new(|_: &Counter| {}));
        binding.destroy();
        binding.destroy();
        assert!(!binding.is_active());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_listener_destroyed_mid_pass_is_skipped() {
        let store = Store::new(Counter::default());
        let late: Arc<Mutex<Option<StoreBinding<Counter>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&late);
        store.on(StoreListener::new(move |_: &Counter| {
            if let Some(binding) = slot.lock().take() {
                binding.destroy();
            }
        }));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        *late.lock() = Some(store.on(StoreListener::new(move |_: &Counter| {
            c.fetch_add(1, Ordering::SeqCst);
        })));

        let _ = store.set(|s| &mut s.count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_is_reported_and_others_run() {
        let collect = Arc::new(Collect::default());
        let store = Store::builder(Counter::default())
            .with_handler(collect.clone())
            .build();
        store.on(StoreListener::new(|_: &Counter| panic!("bad listener")));
        let (calls, _) = counting(&store);

        let _ = store.set(|s| &mut s.count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let seen = collect.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].stage, Stage::Notify);
        assert_eq!(seen[0].message, "bad listener");
    }

    #[tokio::test]
    async fn test_notified_waits_for_deferred_listener() {
        let store = Store::new(Counter::default());
        let (calls, _) = counting(&store);

        let (tx, rx) = oneshot::channel::<()>();
        let rx = Arc::new(Mutex::new(Some(rx)));
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        store.on(StoreListener::deferred(move |_: &Counter| {
            let rx = rx.lock().take();
            let flag = Arc::clone(&flag);
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                flag.store(true, Ordering::SeqCst);
            }
        }));

        let mut notified = store.set(|s| &mut s.count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!notified.is_ready());
        assert!(futures::poll!(&mut notified).is_pending());
        assert!(!done.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        notified.await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_many_deferred_listeners_are_joined() {
        let store = Store::new(Counter::default());
        let total = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let total = Arc::clone(&total);
            store.on(StoreListener::deferred(move |state: &Counter| {
                let total = Arc::clone(&total);
                let add = state.count as usize;
                async move {
                    tokio::task::yield_now().await;
                    total.fetch_add(add, Ordering::SeqCst);
                }
            }));
        }
        store.set(|s| &mut s.count, 2).await;
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_deferred_panic_is_reported() {
        let collect = Arc::new(Collect::default());
        let store = Store::builder(Counter::default())
            .with_handler(collect.clone())
            .build();
        store.on(StoreListener::deferred(|_: &Counter| async {
            panic!("late failure");
        }));

        store.set(|s| &mut s.count, 1).await;
        let seen = collect.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].stage, Stage::Deferred);
        assert_eq!(seen[0].message, "late failure");
    }
}
