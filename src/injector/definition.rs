//! Bean definitions: what a key resolves to and how long the result lives.

use std::any::Any;
use std::sync::Arc;

use super::injector::Injector;
use super::key::BeanKey;
use crate::error::BeanError;

/// Type-erased bean; always holds an `Arc<T>` where `T` is the key's type.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// Builds a fresh erased bean.
pub(crate) type Constructor = Arc<dyn Fn(&Injector) -> Result<Erased, BeanError> + Send + Sync>;

/// Lifetime of resolved beans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingScope {
    /// One instance per injector, created on first resolution.
    #[default]
    Singleton,
    /// A fresh instance on every resolution.
    Prototype,
}

/// How a binding produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// An implementation type instantiated and injected by the injector.
    Implementation,
    /// A ready value returned as is.
    Constant,
}

#[derive(Clone)]
pub(crate) enum BindingKind {
    Implementation {
        implementation: BeanKey,
        construct: Constructor,
    },
    Constant(Erased),
}

impl BindingKind {
    pub(crate) fn binding_type(&self) -> BindingType {
        match self {
            BindingKind::Implementation { .. } => BindingType::Implementation,
            BindingKind::Constant(_) => BindingType::Constant,
        }
    }
}

/// Mapping of one key, created by `bind` and configured once.
#[derive(Clone)]
pub(crate) struct BeanDefinition {
    pub(crate) kind: Option<BindingKind>,
    pub(crate) scope: BindingScope,
    pub(crate) implicit: bool,
}

impl BeanDefinition {
    pub(crate) fn unconfigured() -> Self {
        Self {
            kind: None,
            scope: BindingScope::Singleton,
            implicit: false,
        }
    }

    pub(crate) fn implicit(kind: BindingKind) -> Self {
        Self {
            kind: Some(kind),
            scope: BindingScope::Singleton,
            implicit: true,
        }
    }

    pub(crate) fn describe(&self, key: &BeanKey) -> BindingInfo {
        BindingInfo {
            key: key.clone(),
            binding_type: self.kind.as_ref().map(BindingKind::binding_type),
            implementation: match &self.kind {
                Some(BindingKind::Implementation { implementation, .. }) => {
                    Some(implementation.clone())
                }
                _ => None,
            },
            scope: self.scope,
            implicit: self.implicit,
        }
    }
}

/// Read-only view of a binding, returned by [`Injector::binding`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    /// Bound identity.
    pub key: BeanKey,
    /// `None` while the binding has not been configured.
    pub binding_type: Option<BindingType>,
    /// Implementation type for implementation bindings.
    pub implementation: Option<BeanKey>,
    /// Scope of the binding (meaningless for constants).
    pub scope: BindingScope,
    /// `true` when registered by auto-wiring rather than `bind`.
    pub implicit: bool,
}
