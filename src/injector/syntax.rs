//! # Fluent binding configuration.
//!
//! ```text
//! injector.bind::<dyn Greeter>()
//!     ├── .to::<English>(|e| e)?  ──► ScopeSyntax ──► .as_singleton() / .as_prototype()
//!     ├── .to_self()?             ──► ScopeSyntax   (concrete `T: Default` only)
//!     └── .to_constant(value)?
//! ```
//!
//! ## Rules
//! - A binding is configured once; a second configuration follows
//!   [`RebindPolicy`](crate::RebindPolicy).
//! - Scope selection only applies to the configuration it follows.

use std::marker::PhantomData;
use std::sync::Arc;

use super::definition::{BindingKind, BindingScope, Constructor, Erased};
use super::injector::Injector;
use super::key::BeanKey;
use crate::error::BeanError;

/// Configuration handle returned by [`Injector::bind`].
#[must_use = "a binding is only configured by `to`, `to_self` or `to_constant`"]
pub struct BindingSyntax<'a, T: ?Sized> {
    injector: &'a Injector,
    key: BeanKey,
    _bean: PhantomData<fn() -> Arc<T>>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> BindingSyntax<'a, T> {
    pub(crate) fn new(injector: &'a Injector, key: BeanKey) -> Self {
        Self {
            injector,
            key,
            _bean: PhantomData,
        }
    }

    /// The identity being configured.
    pub fn key(&self) -> &BeanKey {
        &self.key
    }

    /// Binds the key to implementation `I`, created with `Default` and injected.
    ///
    /// `upcast` turns the implementation into the bound type; for trait objects
    /// it is the unsizing coercion `|bean| bean`.
    pub fn to<I>(self, upcast: fn(Arc<I>) -> Arc<T>) -> Result<ScopeSyntax<'a>, BeanError>
    where
        I: Default + Send + Sync + 'static,
    {
        self.injector.register_constructor::<I>();
        let construct: Constructor = Arc::new(move |injector: &Injector| {
            let bean = injector.instantiate::<I>()?;
            let bound: Arc<T> = upcast(Arc::new(bean));
            Ok(Arc::new(bound) as Erased)
        });
        let kind = BindingKind::Implementation {
            implementation: BeanKey::of::<I>(),
            construct,
        };
        let applied = self.injector.configure(&self.key, kind)?;
        Ok(ScopeSyntax {
            injector: self.injector,
            key: self.key,
            applied,
        })
    }

    /// Binds the key to a ready value; no injection is performed on it.
    pub fn to_constant(self, value: impl Into<Arc<T>>) -> Result<(), BeanError> {
        let value: Arc<T> = value.into();
        self.injector
            .configure(&self.key, BindingKind::Constant(Arc::new(value)))
            .map(|_| ())
    }
}

impl<'a, T: Default + Send + Sync + 'static> BindingSyntax<'a, T> {
    /// Binds a concrete type to itself.
    pub fn to_self(self) -> Result<ScopeSyntax<'a>, BeanError> {
        self.to::<T>(|bean| bean)
    }
}

/// Scope selection following an implementation binding.
pub struct ScopeSyntax<'a> {
    injector: &'a Injector,
    key: BeanKey,
    applied: bool,
}

impl ScopeSyntax<'_> {
    /// One shared instance per injector (the default).
    pub fn as_singleton(self) {
        self.scope(BindingScope::Singleton);
    }

    /// A fresh instance per resolution.
    pub fn as_prototype(self) {
        self.scope(BindingScope::Prototype);
    }

    fn scope(self, scope: BindingScope) {
        if self.applied {
            self.injector.set_scope(&self.key, scope);
        }
    }
}
