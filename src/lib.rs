//! # beanwire
//!
//! **Beanwire** is an in-process wiring runtime for Rust applications.
//!
//! It provides a dependency injector with singleton and prototype scopes, a
//! typed synchronous event bus, a linker that remembers subscriptions so a
//! component can drop them all at once, and a reactive store with
//! copy-on-write snapshots.
//!
//! ## Architecture
//! ### Overview
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Context (application scope)                                      │
//! │  - Injector (bindings, singletons, injection tables)               │
//! │  - EventBus (bound as constant)                                   │
//! │  - EventLinker (bound as prototype: one per component)            │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//!  ┌──────────────┐              ┌──────────────┐
//!  │  Component   │              │  Component   │
//!  │ Transceiver  │              │ Transceiver  │
//!  │ bus + linker │              │ bus + linker │
//!  └──┬───────┬───┘              └──┬───────┬───┘
//!     │       │ listen/on_store     │       │
//!     │       ▼                     │       ▼
//!     │   EventLinker ─► tuples     │   EventLinker ─► tuples
//!     │       │                     │       │
//!     ▼       ▼                     ▼       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  EventBus (per-key listener lists)                │
//! └───────────────────────────────────────────────────────────────────┘
//!                                   ▲
//!                 Store<S>::commit ─┘ (stores notify their own listeners;
//!                                      deferred work is awaited via Notified)
//! ```
//!
//! ### Resolution
//! ```text
//! resolve::<T>()
//!   ├─► key == Injector            ─► the injector itself
//!   ├─► singleton cache hit        ─► cached Arc
//!   └─► definition
//!         ├─ Constant(value)       ─► value (cached)
//!         ├─ Implementation(ctor)  ─► guard cycle ─► construct ─► inject
//!         │                            └─ Singleton ─► cache
//!         └─ missing
//!               ├─ auto_wire && known constructor ─► implicit Singleton
//!               └─ otherwise ─► NoSuchBeanDefinition
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                        |
//! |-----------------|----------------------------------------------------------|-------------------------------------------|
//! | **Injection**   | Bind, resolve and inject beans by type or name.          | [`Injector`], [`Inject`], [`BeanKey`]     |
//! | **Events**      | Typed keys, once/times/targeted listeners.               | [`EventBus`], [`EventKey`], [`Listener`]  |
//! | **Linking**     | Track subscriptions and remove them together.            | [`EventLinker`], [`Teardown`]             |
//! | **State**       | Copy-on-write store with change notification.           | [`Store`], [`Patch`], [`Notified`]        |
//! | **Lifecycle**   | Context start-up events and component teardown.         | [`Context`], [`Transceiver`]              |
//! | **Errors**      | Typed resolution errors and failure reporting.           | [`BeanError`], [`FailureHandler`]         |
//! | **Configuration** | Centralize runtime settings.                           | [`Config`]                                |
//!
//! ## Example
//! ```rust
//! use beanwire::{Config, Context, EventKey, Store, Transceiver};
//!
//! #[derive(Clone, Default, PartialEq)]
//! struct Counter {
//!     value: u32,
//! }
//!
//! const BUMPED: EventKey<u32> = EventKey::new("counter.bumped");
//!
//! #[derive(Default)]
//! struct Widget {
//!     base: Transceiver,
//! }
//!
//! let context = Context::builder(Config::default()).build();
//! context
//!     .injector()
//!     .register(Transceiver::points(|w: &Widget| &w.base));
//!
//! let store = Store::new(Counter::default());
//! let widget = context.injector().instantiate::<Widget>().unwrap();
//!
//! let sink = store.clone();
//! widget
//!     .base
//!     .listen_context(&BUMPED)
//!     .unwrap()
//!     .by(move |n| {
//!         let n = *n;
//!         let _ = sink.commit(move |s: &mut Counter| s.value += n);
//!     });
//!
//! context.initialize();
//! widget.base.dispatch(&BUMPED, &3).unwrap();
//! assert_eq!(store.state().value, 3);
//!
//! widget.base.destroy();
//! assert!(!context.bus().has_listeners(&BUMPED));
//! ```

mod core;
mod error;
mod events;
mod injector;
mod lifecycle;
mod linker;
mod store;

// ---- Public re-exports ----

pub use self::core::{Config, Context, ContextBuilder, RebindPolicy};
pub use error::{BeanError, BoxError};
pub use events::{
    EventBinder, EventBinding, EventBindingConfigurer, EventBus, EventContainer, EventEmitter,
    EventKey, Listener, Target,
};
pub use injector::{
    BeanKey, BindingInfo, BindingScope, BindingSyntax, BindingType, Inject, InjectionPoint,
    InjectionPoints, Injector, ScopeSyntax,
};
pub use lifecycle::{
    destroy_all, BeanDestroyErrorHandler, DisposableBean, Failure, FailureHandler, LogDestroyErrors,
    LogFailures, Stage, Transceiver,
};
pub use linker::{EventLinker, LinkedBinding, LinkedConfigurer, Teardown};
pub use store::{Change, Merge, Notified, Patch, Store, StoreBinding, StoreBuilder, StoreListener};
