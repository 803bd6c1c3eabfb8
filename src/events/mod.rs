//! Events: typed keys, listeners and the synchronous bus.
//!
//! ## Contents
//! - [`EventKey`] event tag bound to a payload type
//! - [`Listener`], [`Target`] identities used for removal
//! - [`EventBus`] the default emitter
//! - [`EventBindingConfigurer`], [`EventBinding`] fluent subscription and its handle
//! - [`EventBinder`], [`EventContainer`], [`EventEmitter`] the seams the linker
//!   and [`Context`](crate::Context) are written against
//!
//! ## Quick reference
//! - **Subscribe**: `bus.listen(&KEY).once().by(|args| ..)` or
//!   `bus.add_event_listener(&KEY, &listener, target)`.
//! - **Unsubscribe**: `binding.destroy()` or `bus.remove_event_listener(..)`.
//! - **Publish**: `bus.emit(&KEY, &args)`.

mod binding;
mod bus;
mod key;
mod listener;
mod slots;

pub use binding::{EventBinding, EventBindingConfigurer};
pub use bus::EventBus;
pub use key::EventKey;
pub use listener::{Listener, Target};

pub(crate) use listener::same_target;

/// Source of fluent subscriptions.
pub trait EventBinder {
    /// Starts a subscription for `key`.
    fn listen<A: 'static>(&self, key: &EventKey<A>) -> EventBindingConfigurer<A>;
}

/// Container-style subscription API.
pub trait EventContainer {
    /// Identity of the listener lists behind this container.
    ///
    /// Clones of one bus, and a context wrapping it, report the same id.
    fn container_id(&self) -> usize;

    /// Appends `listener` to the listeners of `key`.
    fn add_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    );

    /// Removes registrations of `listener` for `key` made with exactly `target`.
    fn remove_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    );
}

/// Full emitter: subscribe and publish.
pub trait EventEmitter: EventBinder + EventContainer {
    /// Synchronously calls the listeners of `key` in registration order.
    fn emit<A: 'static>(&self, key: &EventKey<A>, args: &A);
}
