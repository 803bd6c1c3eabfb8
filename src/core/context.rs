//! # Application context.
//!
//! [`Context`] is the explicit entry point of an application or module. It
//! owns one [`Injector`] and one [`EventBus`] and pre-binds:
//! - `EventBus` as a constant (every component shares the context bus);
//! - `EventLinker` as a prototype (every component gets its own linker).
//!
//! ## Lifecycle
//! ```text
//! Context::builder(cfg).build()
//!     └──► initialize()
//!             ├──► emit INITIALIZING
//!             ├──► emit INITIALIZED
//!             └──► emit READY          (once; later calls are no-ops)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use super::builder::ContextBuilder;
use super::config::Config;
use crate::events::{
    EventBinder, EventBindingConfigurer, EventBus, EventContainer, EventEmitter, EventKey, Listener,
    Target,
};
use crate::injector::Injector;

/// Scope of dependencies with its own event bus.
///
/// # Example
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use beanwire::{Config, Context};
///
/// let context = Context::builder(Config::default()).build();
/// let ready = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&ready);
/// context
///     .bus()
///     .listen(&Context::READY)
///     .once()
///     .by(move |_| flag.store(true, Ordering::SeqCst));
///
/// context.initialize();
/// assert!(ready.load(Ordering::SeqCst));
/// assert!(context.is_initialized());
/// ```
pub struct Context {
    injector: Injector,
    bus: EventBus,
    config: Config,
    initialized: AtomicBool,
}

impl Context {
    /// Emitted first by [`initialize`](Self::initialize).
    pub const INITIALIZING: EventKey<()> = EventKey::new("context.initializing");
    /// Emitted once the context is initialized.
    pub const INITIALIZED: EventKey<()> = EventKey::new("context.initialized");
    /// Emitted last; the context is ready to serve requests.
    pub const READY: EventKey<()> = EventKey::new("context.ready");

    /// Creates a context with the default configuration.
    pub fn new() -> Self {
        ContextBuilder::new(Config::default()).build()
    }

    /// Starts configuring a context.
    pub fn builder(cfg: Config) -> ContextBuilder {
        ContextBuilder::new(cfg)
    }

    pub(crate) fn from_parts(injector: Injector, bus: EventBus, config: Config) -> Self {
        Self {
            injector,
            bus,
            config,
            initialized: AtomicBool::new(false),
        }
    }

    /// Dependency injector of this context.
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Event bus of this context.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns `true` once [`initialize`](Self::initialize) ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Marks the context initialized and announces it on the bus.
    ///
    /// Idempotent: only the first call emits.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("context initializing");
        if !self.config.announce_lifecycle {
            return;
        }
        for key in [&Self::INITIALIZING, &Self::INITIALIZED, &Self::READY] {
            self.bus.emit(key, &());
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("injector", &self.injector)
            .field("bus", &self.bus)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl EventBinder for Context {
    fn listen<A: 'static>(&self, key: &EventKey<A>) -> EventBindingConfigurer<A> {
        self.bus.listen(key)
    }
}

impl EventContainer for Context {
    fn container_id(&self) -> usize {
        self.bus.container_id()
    }

    fn add_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        self.bus.add_event_listener(key, listener, target)
    }

    fn remove_event_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) {
        self.bus.remove_event_listener(key, listener, target)
    }
}

impl EventEmitter for Context {
    fn emit<A: 'static>(&self, key: &EventKey<A>, args: &A) {
        self.bus.emit(key, args)
    }
}
