//! # Bean identities.
//!
//! A [`BeanKey`] names a bindable contract:
//! - `BeanKey::of::<T>()` for a concrete type or a trait object (`dyn Greeter`);
//! - `BeanKey::named("clock")` for an explicit symbolic key.
//!
//! Type keys compare by `TypeId`; named keys by their string.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a binding inside an [`Injector`](crate::Injector).
#[derive(Clone)]
pub enum BeanKey {
    /// Keyed by a Rust type.
    Type {
        /// Type identity.
        id: TypeId,
        /// Type name, for messages only.
        name: &'static str,
    },
    /// Keyed by an explicit name.
    Named(Arc<str>),
}

impl BeanKey {
    /// Key of type `T` (may be unsized, e.g. `dyn Trait`).
    pub fn of<T: ?Sized + 'static>() -> Self {
        BeanKey::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Explicit symbolic key.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        BeanKey::Named(name.into())
    }

    /// Human-readable name of the key.
    pub fn name(&self) -> &str {
        match self {
            BeanKey::Type { name, .. } => name,
            BeanKey::Named(name) => name,
        }
    }

    /// Returns `true` for keys built with [`BeanKey::of`].
    pub fn is_type(&self) -> bool {
        matches!(self, BeanKey::Type { .. })
    }
}

impl PartialEq for BeanKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BeanKey::Type { id: a, .. }, BeanKey::Type { id: b, .. }) => a == b,
            (BeanKey::Named(a), BeanKey::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for BeanKey {}

impl Hash for BeanKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            BeanKey::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            BeanKey::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for BeanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeanKey::Type { name, .. } => write!(f, "BeanKey::Type({name})"),
            BeanKey::Named(name) => write!(f, "BeanKey::Named({name:?})"),
        }
    }
}

impl fmt::Display for BeanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
