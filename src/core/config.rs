//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for an [`Injector`](crate::Injector),
//! the [`EventBus`](crate::EventBus) and the [`Context`](crate::Context) that owns both.
//!
//! Config is used in two ways:
//! 1. **Context creation**: `Context::builder(config).build()`
//! 2. **Standalone injector**: `Injector::with_config(config)`
//!
//! ## Sentinel values
//! - `listener_capacity = 0` → treated as 1 by the bus

/// What happens when an already configured binding is configured again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebindPolicy {
    /// Fail with [`BeanError::AlreadyBound`](crate::BeanError::AlreadyBound).
    #[default]
    Reject,
    /// Keep the first configuration and return normally.
    Ignore,
}

/// Global configuration of the runtime.
///
/// Defines:
/// - **Binding rules**: second configuration of a key, auto-wiring of concrete types
/// - **Event system**: initial capacity of per-event listener lists
/// - **Lifecycle**: whether a context announces its start-up on the bus
///
/// ## Field semantics
/// - `rebind`: Policy for configuring a key twice (default reject)
/// - `auto_wire`: Resolve unbound concrete types with a known constructor as singletons
/// - `listener_capacity`: Initial slots per event list (min 1; clamped by the bus)
/// - `announce_lifecycle`: Emit `initializing` / `initialized` / `ready` from `Context::initialize`
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors over
/// sentinel checks.
#[derive(Clone, Debug)]
pub struct Config {
    /// Policy applied when a configured binding is configured again.
    pub rebind: RebindPolicy,

    /// Registers unbound concrete types as implicit singletons on first resolution.
    ///
    /// Only types whose constructor the injector has seen (through `bean`,
    /// `instantiate`, `to` or `to_self`) can be auto-wired.
    pub auto_wire: bool,

    /// Initial capacity of each per-event listener list.
    pub listener_capacity: usize,

    /// Whether `Context::initialize` emits the lifecycle events.
    pub announce_lifecycle: bool,
}

impl Config {
    /// Returns a listener capacity clamped to a minimum of 1.
    #[inline]
    pub fn listener_capacity_clamped(&self) -> usize {
        self.listener_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `rebind = RebindPolicy::Reject`
    /// - `auto_wire = true`
    /// - `listener_capacity = 4`
    /// - `announce_lifecycle = true`
    fn default() -> Self {
        Self {
            rebind: RebindPolicy::default(),
            auto_wire: true,
            listener_capacity: 4,
            announce_lifecycle: true,
        }
    }
}
