//! # Injection cells.
//!
//! An [`Inject<T>`] field replaces a "this property wants bean X" annotation.
//! The injector fills it while walking the owner's
//! [`InjectionPoints`](crate::InjectionPoints):
//!
//! ```text
//!             bind_source(injector, key)
//! empty ─────────────────────────────────► bound ──► get() ──► resolved
//!   │                                                 ▲
//!   └── eager point: bind_source + get() ─────────────┘
//! ```
//!
//! A bound cell keeps only a weak reference to its injector; once resolved,
//! it holds the bean. An `Inject<Injector>` is never cached: every `get`
//! upgrades the weak reference, so a bean cannot keep its injector alive.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::injector::{Injector, WeakInjector};
use super::key::BeanKey;
use crate::error::BeanError;

struct Source {
    injector: WeakInjector,
    key: BeanKey,
}

/// Resolve-on-first-access dependency slot.
pub struct Inject<T: ?Sized> {
    value: OnceLock<Arc<T>>,
    source: OnceLock<Source>,
}

impl<T: ?Sized + Send + Sync + 'static> Inject<T> {
    /// Creates an empty cell.
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            source: OnceLock::new(),
        }
    }

    /// Returns the bean, resolving and caching it on first call.
    ///
    /// The injector itself is resolved on every call and never cached.
    ///
    /// ### Errors
    /// - [`BeanError::Unresolved`] if no injector filled the cell or it is gone.
    /// - Any resolution error of the recorded key.
    pub fn get(&self) -> Result<Arc<T>, BeanError> {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }
        let unresolved = || BeanError::Unresolved {
            expected: std::any::type_name::<T>(),
        };
        let source = self.source.get().ok_or_else(unresolved)?;
        let injector = source.injector.upgrade().ok_or_else(unresolved)?;
        let value = injector.resolve_key::<T>(&source.key)?;
        if TypeId::of::<T>() == TypeId::of::<Injector>() {
            return Ok(value);
        }
        Ok(Arc::clone(self.value.get_or_init(|| value)))
    }

    /// Returns the bean only if it has already been resolved.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.value.get().cloned()
    }

    /// Returns `true` once the bean has been resolved or set.
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Fills the cell by hand. Returns `false` if it already holds a bean.
    pub fn set(&self, value: Arc<T>) -> bool {
        self.value.set(value).is_ok()
    }

    /// Key recorded by the injector, if any.
    pub fn key(&self) -> Option<&BeanKey> {
        self.source.get().map(|s| &s.key)
    }

    /// Injector that filled the cell, while it is alive.
    pub fn injector(&self) -> Option<Injector> {
        self.source.get().and_then(|s| s.injector.upgrade())
    }

    /// Records where the bean comes from; the first injector wins.
    pub(crate) fn bind_source(&self, injector: &Injector, key: BeanKey) {
        let _ = self.source.set(Source {
            injector: injector.downgrade(),
            key,
        });
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &std::any::type_name::<T>())
            .field("key", &self.source.get().map(|s| &s.key))
            .field("resolved", &self.value.get().is_some())
            .finish()
    }
}
