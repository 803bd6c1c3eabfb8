//! # Subscription linker.
//!
//! [`EventLinker`] remembers every subscription made through it so a
//! component can drop all of them with one [`remove_listeners`](EventLinker::remove_listeners).
//!
//! ## Architecture
//! ```text
//! linker.listen(&bus, &KEY).by(..)          ──► handles: [(id, EventBinding)]
//! linker.on_store(&store, listener)         ──► handles: [(id, StoreBinding)]
//! linker.add_listener(&bus, &KEY, &l, t)    ──► tuples:  [(container, tag, listener, target, remove)]
//!
//! remove_listeners()
//!     ├──► tuples  ──► container.remove_event_listener(..)
//!     ├──► handles ──► destroy()
//!     └──► both lists cleared (second call is a no-op)
//! ```
//!
//! ## Rules
//! - The internal lock is released before any container or handle is called.
//! - Order among recorded tuples and handles is irrelevant.
//! - Handles that ended on their own (`once`, `times`) are forgotten on the
//!   next subscription.
//! - A failing teardown step is reported and the remaining steps still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::panic_message;
use crate::events::{
    same_target, EventBinder, EventBinding, EventBindingConfigurer, EventContainer, EventKey,
    Listener, Target,
};
use crate::lifecycle::{default_handler, Failure, FailureHandler, Stage};
use crate::store::{Store, StoreBinding, StoreListener};

/// A subscription handle the linker can tear down.
pub trait Teardown: Send + Sync {
    /// Ends the subscription. Must be idempotent.
    fn destroy(&self);

    /// Returns `true` once the subscription ended, by `destroy` or on its own.
    fn is_destroyed(&self) -> bool;
}

impl Teardown for EventBinding {
    fn destroy(&self) {
        EventBinding::destroy(self)
    }

    fn is_destroyed(&self) -> bool {
        EventBinding::is_destroyed(self)
    }
}

impl<S: Send + Sync + 'static> Teardown for StoreBinding<S> {
    fn destroy(&self) {
        StoreBinding::destroy(self)
    }

    fn is_destroyed(&self) -> bool {
        !self.is_active()
    }
}

struct Tuple {
    container: usize,
    tag: Arc<str>,
    listener_id: usize,
    target: Option<Target>,
    remove: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct LinkerState {
    tuples: Vec<Tuple>,
    handles: Vec<(u64, Box<dyn Teardown>)>,
    next_id: u64,
}

impl LinkerState {
    /// Records `handle`, forgetting handles that already ended.
    fn track(&mut self, handle: Box<dyn Teardown>) -> u64 {
        self.handles.retain(|(_, h)| !h.is_destroyed());
        self.next_id += 1;
        self.handles.push((self.next_id, handle));
        self.next_id
    }

    fn untrack(&mut self, id: u64) {
        if let Some(pos) = self.handles.iter().position(|(h, _)| *h == id) {
            self.handles.swap_remove(pos);
        }
    }
}

/// Groups subscriptions for bulk teardown.
///
/// Cheap to clone; clones share the records. Bound as a prototype by
/// [`Context`](crate::Context), so every component gets its own.
///
/// # Example
/// ```rust
/// use beanwire::{EventBus, EventKey, EventLinker};
///
/// const SAVED: EventKey<u32> = EventKey::new("saved");
///
/// let bus = EventBus::new();
/// let linker = EventLinker::new();
/// linker.listen(&bus, &SAVED).by(|id| println!("saved {id}"));
/// linker.listen(&bus, &SAVED).once().by(|_| {});
/// assert_eq!(bus.listener_count(&SAVED), 2);
///
/// linker.remove_listeners();
/// assert_eq!(bus.listener_count(&SAVED), 0);
/// ```
#[derive(Clone)]
pub struct EventLinker {
    state: Arc<Mutex<LinkerState>>,
    handler: Arc<dyn FailureHandler>,
}

impl EventLinker {
    /// Creates an empty linker that logs teardown failures.
    pub fn new() -> Self {
        Self::with_handler(default_handler())
    }

    /// Creates an empty linker reporting teardown failures to `handler`.
    pub fn with_handler(handler: Arc<dyn FailureHandler>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkerState::default())),
            handler,
        }
    }

    /// Starts a subscription on `binder` that this linker will remember.
    pub fn listen<B, A>(&self, binder: &B, key: &EventKey<A>) -> LinkedConfigurer<A>
    where
        B: EventBinder + ?Sized,
        A: 'static,
    {
        LinkedConfigurer {
            linker: self.clone(),
            inner: binder.listen(key),
        }
    }

    /// Adds `listener` to `container` and records the tuple.
    pub fn add_listener<C, A>(
        &self,
        container: &C,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) where
        C: EventContainer + Clone + Send + Sync + 'static,
        A: 'static,
    {
        container.add_event_listener(key, listener, target);
        let remove = {
            let (container, key, listener, target) =
                (container.clone(), key.clone(), listener.clone(), target.cloned());
            move || container.remove_event_listener(&key, &listener, target.as_ref())
        };
        self.state.lock().tuples.push(Tuple {
            container: container.container_id(),
            tag: Arc::from(key.name()),
            listener_id: listener.id(),
            target: target.cloned(),
            remove: Box::new(remove),
        });
    }

    /// Removes `listener` from `container` and forgets the first tuple
    /// recorded for the same container, tag, listener and target.
    ///
    /// Forgetting a tuple that was never added is a no-op.
    pub fn remove_listener<C, A>(
        &self,
        container: &C,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) where
        C: EventContainer + ?Sized,
        A: 'static,
    {
        container.remove_event_listener(key, listener, target);
        let (container, listener_id) = (container.container_id(), listener.id());
        let mut state = self.state.lock();
        let found = state.tuples.iter().position(|t| {
            t.container == container
                && t.listener_id == listener_id
                && same_target(t.target.as_ref(), target)
                && &*t.tag == key.name()
        });
        if let Some(pos) = found {
            state.tuples.swap_remove(pos);
        }
    }

    /// Registers `listener` on `store` and remembers the binding.
    pub fn on_store<S>(
        &self,
        store: &Store<S>,
        listener: StoreListener<S>,
        target: Option<&Target>,
    ) -> StoreBinding<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let binding = match target {
            Some(target) => store.on_target(listener, target),
            None => store.on(listener),
        };
        self.state.lock().track(Box::new(binding.clone()));
        binding
    }

    /// Removes every recorded tuple and destroys every recorded handle.
    pub fn remove_listeners(&self) {
        let (tuples, handles) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.tuples),
                std::mem::take(&mut state.handles),
            )
        };
        if tuples.is_empty() && handles.is_empty() {
            return;
        }
        tracing::debug!(tuples = tuples.len(), handles = handles.len(), "removing linked listeners");

        for tuple in tuples {
            let tag = Arc::clone(&tuple.tag);
            if let Err(panic) = catch_unwind(AssertUnwindSafe(tuple.remove)) {
                self.report(&tag, panic_message(panic.as_ref()));
            }
        }
        for (_, handle) in handles {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handle.destroy())) {
                self.report("handle", panic_message(panic.as_ref()));
            }
        }
    }

    /// Number of recorded tuples and handles.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.tuples.len() + state.handles.len()
    }

    /// Returns `true` if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn track(&self, handle: Box<dyn Teardown>) -> u64 {
        self.state.lock().track(handle)
    }

    fn report(&self, subject: &str, message: String) {
        self.handler
            .on_failure(&Failure::new(Stage::Destroy, subject, message));
    }
}

impl Default for EventLinker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventLinker")
            .field("tuples", &state.tuples.len())
            .field("handles", &state.handles.len())
            .finish()
    }
}

/// [`EventBindingConfigurer`] whose binding is recorded by a linker.
#[must_use = "a subscription is only registered by `by` / `by_listener`"]
pub struct LinkedConfigurer<A> {
    linker: EventLinker,
    inner: EventBindingConfigurer<A>,
}

impl<A: 'static> LinkedConfigurer<A> {
    /// Fires the listener a single time.
    pub fn once(self) -> Self {
        Self {
            linker: self.linker,
            inner: self.inner.once(),
        }
    }

    /// Fires the listener `n` times.
    pub fn times(self, n: u32) -> Self {
        Self {
            linker: self.linker,
            inner: self.inner.times(n),
        }
    }

    /// Activates the subscription with a closure.
    pub fn by(self, listener: impl Fn(&A) + Send + Sync + 'static) -> LinkedBinding {
        self.by_listener(&Listener::new(listener), None)
    }

    /// Activates the subscription with a shared listener and optional target.
    pub fn by_listener(self, listener: &Listener<A>, target: Option<&Target>) -> LinkedBinding {
        let binding = self.inner.by_listener(listener, target);
        let id = self.linker.track(Box::new(binding.clone()));
        LinkedBinding {
            binding,
            linker: Arc::downgrade(&self.linker.state),
            id,
        }
    }
}

/// Bus subscription recorded by a linker.
///
/// [`destroy`](Self::destroy) also makes the linker forget it.
#[derive(Clone)]
pub struct LinkedBinding {
    binding: EventBinding,
    linker: Weak<Mutex<LinkerState>>,
    id: u64,
}

impl LinkedBinding {
    /// See [`EventBinding::pause`].
    pub fn pause(&self) {
        self.binding.pause();
    }

    /// See [`EventBinding::resume`].
    pub fn resume(&self) {
        self.binding.resume();
    }

    /// Ends the subscription and drops it from the linker.
    pub fn destroy(&self) {
        self.binding.destroy();
        if let Some(state) = self.linker.upgrade() {
            state.lock().untrack(self.id);
        }
    }

    /// See [`EventBinding::is_active`].
    pub fn is_active(&self) -> bool {
        self.binding.is_active()
    }

    /// Underlying bus handle.
    pub fn binding(&self) -> &EventBinding {
        &self.binding
    }
}

impl std::fmt::Debug for LinkedBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedBinding")
            .field("binding", &self.binding)
            .field("id", &self.id)
            .finish()
    }
}
