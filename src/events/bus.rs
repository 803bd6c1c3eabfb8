//! # Synchronous event bus.
//!
//! [`EventBus`] routes named events to the listeners registered for them, in
//! registration order, on the caller's stack.
//!
//! ## Architecture
//! ```text
//! emit(key, args)
//!     │
//!     ├──► lists[key.name] ── lock += 1 (EmitGuard)
//!     │        │
//!     │        ├──► slot 0 ──► times -= 1 ──► listener(args)   (panic → FailureHandler)
//!     │        ├──► slot 1 ──► paused, skipped
//!     │        └──► slot N ──► times == 0 ──► tombstone after call
//!     │
//!     └──► EmitGuard::drop ── lock -= 1 ──► compact when lock == 0
//! ```
//!
//! ## Rules
//! - **Registration order** within one pass.
//! - **Reentrant**: listeners may emit, subscribe and unsubscribe; the internal
//!   mutex is never held while a listener runs.
//! - **Counters**: a finite counter is decremented before the call; the listener
//!   runs while the counter is `>= 0` and is evicted once it is `<= 0`.
//! - **Isolation**: a panicking listener is reported and the pass continues.
//! - **Late subscribers**: listeners added during a pass are not called by it.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::binding::{EventBinding, EventBindingConfigurer, SlotState};
use super::key::EventKey;
use super::listener::{same_target, Listener, Target};
use super::slots::SlotList;
use super::{EventBinder, EventContainer, EventEmitter};
use crate::core::Config;
use crate::error::panic_message;
use crate::lifecycle::{default_handler, Failure, FailureHandler, Stage};

type ErasedListener = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// One registration inside a per-event list.
pub(crate) struct Slot {
    id: u64,
    listener_id: usize,
    listener: ErasedListener,
    target: Option<Target>,
    times: Option<i64>,
    state: Arc<SlotState>,
}

pub(crate) struct BusInner {
    lists: Mutex<HashMap<Arc<str>, SlotList<Slot>>>,
    handler: Arc<dyn FailureHandler>,
    capacity: usize,
    next_id: AtomicU64,
}

/// Typed publish/subscribe bus.
///
/// Cheap to clone; clones share the same listener lists.
///
/// # Example
/// ```rust
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use beanwire::{EventBus, EventKey};
///
/// const TICK: EventKey<u32> = EventKey::new("tick");
///
/// let bus = EventBus::new();
/// let total = Arc::new(AtomicU32::new(0));
/// let sink = Arc::clone(&total);
/// let binding = bus.listen(&TICK).by(move |n| {
///     sink.fetch_add(*n, Ordering::SeqCst);
/// });
///
/// bus.emit(&TICK, &2);
/// binding.pause();
/// bus.emit(&TICK, &40);
/// assert_eq!(total.load(Ordering::SeqCst), 2);
/// ```
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates a bus that logs listener failures.
    pub fn new() -> Self {
        Self::with_handler(default_handler())
    }

    /// Creates a bus reporting listener failures to `handler`.
    pub fn with_handler(handler: Arc<dyn FailureHandler>) -> Self {
        Self::build(handler, Config::default().listener_capacity_clamped())
    }

    pub(crate) fn from_config(cfg: &Config, handler: Arc<dyn FailureHandler>) -> Self {
        Self::build(handler, cfg.listener_capacity_clamped())
    }

    fn build(handler: Arc<dyn FailureHandler>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                lists: Mutex::new(HashMap::new()),
                handler,
                capacity,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Starts a fluent subscription for `key`.
    pub fn listen<A: 'static>(&self, key: &EventKey<A>) -> EventBindingConfigurer<A> {
        EventBindingConfigurer::new(self.clone(), key.clone())
    }

    /// Registers `listener` for `key`; the same pair may be registered many times.
    pub fn add_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        self.subscribe(key, listener, target.cloned(), None);
    }

    /// Removes every registration of `listener` for `key` made with exactly `target`.
    pub fn remove_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        let listener_id = listener.id();
        let removed = {
            let mut lists = self.inner.lists.lock();
            let Some(list) = lists.get_mut(key.name()) else {
                return;
            };
            let removed = list.take_where(|slot| {
                slot.listener_id == listener_id && same_target(slot.target.as_ref(), target)
            });
            drop_if_empty(&mut lists, key.name());
            removed
        };
        for slot in removed {
            slot.state.mark_destroyed();
        }
    }

    /// Synchronously invokes the active listeners of `key` with `args`.
    pub fn emit<A: 'static>(&self, key: &EventKey<A>, args: &A) {
        let tag = key.name();
        let size = {
            let mut lists = self.inner.lists.lock();
            let Some(list) = lists.get_mut(tag) else {
                return;
            };
            list.lock();
            list.len()
        };
        let _guard = EmitGuard {
            inner: &self.inner,
            tag,
        };
        tracing::trace!(event = tag, listeners = size, "emit");

        for index in 0..size {
            let Some(listener) = self.next_call(tag, index) else {
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| listener(args as &dyn Any)));
            if let Err(panic) = result {
                let failure = Failure::new(Stage::Emit, tag, panic_message(panic.as_ref()));
                self.inner.handler.on_failure(&failure);
            }
        }
    }

    /// Returns the number of live registrations for `key`.
    pub fn listener_count<A: 'static>(&self, key: &EventKey<A>) -> usize {
        self.inner
            .lists
            .lock()
            .get(key.name())
            .map_or(0, SlotList::live)
    }

    /// Returns `true` if at least one registration exists for `key`.
    pub fn has_listeners<A: 'static>(&self, key: &EventKey<A>) -> bool {
        self.listener_count(key) > 0
    }

    /// Picks the listener to call at `index`, applying counters and eviction.
    fn next_call(&self, tag: &str, index: usize) -> Option<ErasedListener> {
        let mut lists = self.inner.lists.lock();
        let list = lists.get_mut(tag)?;
        let slot = list.get_mut(index)?;
        if slot.state.is_paused() {
            return None;
        }
        if let Some(times) = slot.times.as_mut() {
            *times -= 1;
        }
        let invoke = slot.times.map_or(true, |t| t >= 0);
        let evict = slot.times.is_some_and(|t| t <= 0);
        let listener = invoke.then(|| Arc::clone(&slot.listener));
        if evict {
            if let Some(slot) = list.take(index) {
                slot.state.mark_destroyed();
            }
        }
        listener
    }

    pub(crate) fn subscribe<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<Target>,
        times: Option<i64>,
    ) -> EventBinding {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(SlotState::default());
        let tag: Arc<str> = Arc::from(key.name());
        let typed = listener.clone();
        let erased: ErasedListener = Arc::new(move |args: &dyn Any| match args.downcast_ref::<A>() {
            Some(args) => typed.call(args),
            None => tracing::warn!(
                expected = std::any::type_name::<A>(),
                "event payload type mismatch; listener skipped"
            ),
        });
        let slot = Slot {
            id,
            listener_id: listener.id(),
            listener: erased,
            target,
            times,
            state: Arc::clone(&state),
        };

        let mut lists = self.inner.lists.lock();
        lists
            .entry(Arc::clone(&tag))
            .or_insert_with(|| SlotList::with_capacity(self.inner.capacity))
            .push(slot);
        EventBinding::new(Arc::downgrade(&self.inner), tag, id, state)
    }
}

impl BusInner {
    /// Removes the registration with `id`, if still present.
    pub(crate) fn remove_by_id(&self, tag: &str, id: u64) {
        let mut lists = self.lists.lock();
        if let Some(list) = lists.get_mut(tag) {
            list.take_where(|slot| slot.id == id);
            drop_if_empty(&mut lists, tag);
        }
    }
}

/// Forgets the list of `tag` once it is empty and no pass walks it.
fn drop_if_empty(lists: &mut HashMap<Arc<str>, SlotList<Slot>>, tag: &str) {
    if lists
        .get(tag)
        .is_some_and(|list| !list.is_locked() && list.len() == 0)
    {
        lists.remove(tag);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lists = self.inner.lists.lock();
        f.debug_struct("EventBus")
            .field("events", &lists.len())
            .finish()
    }
}

/// Releases the per-event lock even if the pass unwinds.
struct EmitGuard<'a> {
    inner: &'a BusInner,
    tag: &'a str,
}

impl Drop for EmitGuard<'_> {
    fn drop(&mut self) {
        let mut lists = self.inner.lists.lock();
        let Some(list) = lists.get_mut(self.tag) else {
            return;
        };
        list.unlock();
        drop_if_empty(&mut lists, self.tag);
    }
}

impl EventBinder for EventBus {
    fn listen<A: 'static>(&self, key: &EventKey<A>) -> EventBindingConfigurer<A> {
        EventBus::listen(self, key)
    }
}

impl EventContainer for EventBus {
    fn container_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn add_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        EventBus::add_event_listener(self, key, listener, target)
    }

    fn remove_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        EventBus::remove_event_listener(self, key, listener, target)
    }
}

impl EventEmitter for EventBus {
    fn emit<A: 'static>(&self, key: &EventKey<A>, args: &A) {
        EventBus::emit(self, key, args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex as PlMutex;

    use super::*;
    use crate::lifecycle::testing::Collect;

    const X: EventKey<()> = EventKey::new("x");
    const NUM: EventKey<u32> = EventKey::new("num");

    fn recorder() -> (Arc<PlMutex<Vec<&'static str>>>, impl Fn(&'static str) -> Listener<()>) {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |name: &'static str| {
            let sink = Arc::clone(&sink);
            Listener::new(move |_: &()| sink.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_emit_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        for name in ["a", "b", "c"] {
            bus.add_event_listener(&X, &make(name), None);
        }
        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&X, &());
        assert!(!bus.has_listeners(&X));
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let binding = bus.listen(&X).once().by(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&X, &());
        bus.emit(&X, &());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(binding.is_destroyed());
        assert_eq!(bus.listener_count(&X), 0);
    }

    #[test]
    fn test_times_counts_down() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        bus.listen(&NUM).times(3).by(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        for n in 0..5 {
            bus.emit(&NUM, &n);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_self_removal_during_emit_keeps_siblings() {
        let bus = EventBus::new();
        let log = Arc::new(PlMutex::new(Vec::new()));

        let la = Arc::clone(&log);
        bus.listen(&X).by(move |_| la.lock().push("a"));

        let slot: Arc<PlMutex<Option<EventBinding>>> = Arc::new(PlMutex::new(None));
        let lb = Arc::clone(&log);
        let me = Arc::clone(&slot);
        let b = bus.listen(&X).by(move |_| {
            lb.lock().push("b");
            if let Some(binding) = me.lock().take() {
                binding.destroy();
            }
        });
        *slot.lock() = Some(b);

        let lc = Arc::clone(&log);
        bus.listen(&X).by(move |_| lc.lock().push("c"));

        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);

        log.lock().clear();
        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["a", "c"]);
        assert_eq!(bus.listener_count(&X), 2);
    }

    #[test]
    fn test_remove_event_listener_matches_target() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let listener = make("l");
        let target = Target::new(());

        bus.add_event_listener(&X, &listener, None);
        bus.add_event_listener(&X, &listener, Some(&target));

        bus.remove_event_listener(&X, &listener, None);
        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["l"]);
        assert_eq!(bus.listener_count(&X), 1);

        bus.remove_event_listener(&X, &listener, Some(&target));
        assert_eq!(bus.listener_count(&X), 0);
    }

    #[test]
    fn test_remove_all_duplicates() {
        let bus = EventBus::new();
        let (_log, make) = recorder();
        let listener = make("dup");
        bus.add_event_listener(&X, &listener, None);
        bus.add_event_listener(&X, &listener, None);
        assert_eq!(bus.listener_count(&X), 2);
        bus.remove_event_listener(&X, &listener, None);
        assert_eq!(bus.listener_count(&X), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_abort_pass() {
        let collect = Arc::new(Collect::default());
        let bus = EventBus::with_handler(collect.clone());
        let (log, make) = recorder();

        bus.add_event_listener(&X, &make("before"), None);
        bus.listen(&X).by(|_| panic!("listener exploded"));
        bus.add_event_listener(&X, &make("after"), None);

        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["before", "after"]);

        let seen = collect.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].stage, Stage::Emit);
        assert_eq!(&*seen[0].subject, "x");
        assert_eq!(seen[0].message, "listener exploded");
    }

    #[test]
    fn test_pause_before_index_suppresses_current_pass() {
        let bus = EventBus::new();
        let log = Arc::new(PlMutex::new(Vec::new()));

        let slot: Arc<PlMutex<Option<EventBinding>>> = Arc::new(PlMutex::new(None));
        let pauser = Arc::clone(&slot);
        let la = Arc::clone(&log);
        bus.listen(&X).by(move |_| {
            la.lock().push("a");
            if let Some(b) = pauser.lock().take() {
                b.pause();
            }
        });
        let lb = Arc::clone(&log);
        let b = bus.listen(&X).by(move |_| lb.lock().push("b"));
        *slot.lock() = Some(b.clone());

        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["a"]);

        b.resume();
        bus.emit(&X, &());
        assert_eq!(*log.lock(), vec!["a", "a", "b"]);
    }

    #[test]
    fn test_nested_emit_sees_tombstones() {
        let bus = EventBus::new();
        let depth = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let d = Arc::clone(&depth);
        bus.listen(&X).once().by(move |_| {
            if d.fetch_add(1, Ordering::SeqCst) == 0 {
                inner_bus.emit(&X, &());
            }
        });
        let h = Arc::clone(&hits);
        bus.listen(&X).by(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&X, &());
        // the once listener ran only in the outer pass; the second one in both passes
        assert_eq!(depth.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(bus.listener_count(&X), 1);
    }

    #[test]
    fn test_listener_added_during_emit_waits_for_next_pass() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let inner_bus = bus.clone();
        let h = Arc::clone(&hits);
        bus.listen(&X).once().by(move |_| {
            let h = Arc::clone(&h);
            inner_bus.listen(&X).by(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.emit(&X, &());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.emit(&X, &());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_payload_reaches_listener() {
        let bus = EventBus::new();
        let got = Arc::new(AtomicUsize::new(0));
        let g = Arc::clone(&got);
        bus.listen(&NUM).by(move |n| {
            g.store(*n as usize, Ordering::SeqCst);
        });
        bus.emit(&NUM, &17);
        assert_eq!(got.load(Ordering::SeqCst), 17);
    }

    #[test]
    fn test_removed_dynamic_event_leaves_no_list_behind() {
        let bus = EventBus::new();
        let (_log, make) = recorder();
        let listener = make("tmp");
        for n in 0..3 {
            let key = EventKey::<()>::dynamic(format!("request.{n}.done"));
            bus.add_event_listener(&key, &listener, None);
            bus.remove_event_listener(&key, &listener, None);
        }
        assert!(bus.inner.lists.lock().is_empty());

        let key = EventKey::<()>::dynamic("request.bound.done");
        let binding = bus.listen(&key).by(|_| {});
        binding.destroy();
        assert!(bus.inner.lists.lock().is_empty());
    }

    #[test]
    fn test_clones_share_container_id() {
        let bus = EventBus::new();
        assert_eq!(bus.container_id(), bus.clone().container_id());
        assert_ne!(bus.container_id(), EventBus::new().container_id());
    }
}
