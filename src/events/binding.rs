//! # Fluent subscriptions and their handles.
//!
//! ```text
//! bus.listen(&KEY)            ──► EventBindingConfigurer
//!     .once() / .times(n)     ──► EventBindingConfigurer
//!     .by(|args| ...)         ──► EventBinding { pause, resume, destroy }
//! ```
//!
//! A handle outlives nothing: it holds a weak reference to the bus, so
//! `destroy()` after the bus is gone is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::bus::{BusInner, EventBus};
use super::key::EventKey;
use super::listener::{Listener, Target};

/// Flags shared between a slot and its handle.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    paused: AtomicBool,
    destroyed: AtomicBool,
}

impl SlotState {
    #[inline]
    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn mark_destroyed(&self) -> bool {
        self.destroyed.swap(true, Ordering::AcqRel)
    }

    #[inline]
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

/// Fluent configuration of a bus subscription.
///
/// Nothing is registered until [`by`](Self::by) or [`by_listener`](Self::by_listener) is called.
#[must_use = "a subscription is only registered by `by` / `by_listener`"]
pub struct EventBindingConfigurer<A> {
    bus: EventBus,
    key: EventKey<A>,
    times: Option<i64>,
}

impl<A: 'static> EventBindingConfigurer<A> {
    pub(crate) fn new(bus: EventBus, key: EventKey<A>) -> Self {
        Self {
            bus,
            key,
            times: None,
        }
    }

    /// Fires the listener a single time, then removes it.
    pub fn once(self) -> Self {
        self.times(1)
    }

    /// Fires the listener `n` times, then removes it.
    pub fn times(mut self, n: u32) -> Self {
        self.times = Some(i64::from(n));
        self
    }

    /// Activates the subscription with a closure.
    pub fn by(self, listener: impl Fn(&A) + Send + Sync + 'static) -> EventBinding {
        self.by_listener(&Listener::new(listener), None)
    }

    /// Activates the subscription with a shared listener and an optional target.
    pub fn by_listener(self, listener: &Listener<A>, target: Option<&Target>) -> EventBinding {
        self.bus
            .subscribe(&self.key, listener, target.cloned(), self.times)
    }
}

/// Controls the lifecycle of one bus subscription.
///
/// Clones control the same subscription.
#[derive(Clone)]
pub struct EventBinding {
    bus: Weak<BusInner>,
    tag: Arc<str>,
    id: u64,
    state: Arc<SlotState>,
}

impl EventBinding {
    pub(crate) fn new(bus: Weak<BusInner>, tag: Arc<str>, id: u64, state: Arc<SlotState>) -> Self {
        Self { bus, tag, id, state }
    }

    /// Stops delivering events until [`resume`](Self::resume).
    ///
    /// Takes effect for every slot the running pass has not reached yet.
    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::Release);
    }

    /// Continues delivering events.
    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::Release);
    }

    /// Removes the subscription from the bus. Idempotent.
    pub fn destroy(&self) {
        self.state.paused.store(true, Ordering::Release);
        if self.state.mark_destroyed() {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_by_id(&self.tag, self.id);
        }
    }

    /// Returns `true` while registered and not paused.
    pub fn is_active(&self) -> bool {
        !self.state.is_destroyed() && !self.state.is_paused()
    }

    /// Returns `true` once destroyed or exhausted.
    pub fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    /// Returns the event tag this subscription listens to.
    pub fn event(&self) -> &str {
        &self.tag
    }
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("event", &self.tag)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
