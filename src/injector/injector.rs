//! # Dependency injector.
//!
//! [`Injector`] maps [`BeanKey`]s to definitions, caches singletons and fills
//! the [`Inject`](crate::Inject) cells of the beans it creates.
//!
//! ## Architecture
//! ```text
//! resolve::<T>() ──► bean(key)
//!                      │
//!                      ├── key == Injector ──► self
//!                      ├── definitions[key] ── missing ──► auto-wire (known constructor)
//!                      │                                    └─ else NoSuchBeanDefinition
//!                      │
//!                      ├── Singleton ──► singletons[key] hit ──► cached
//!                      │                 miss ──► create ──► cache
//!                      └── Prototype ──► create
//!
//! create: Constant        ──► stored value (no injection)
//!         Implementation  ──► creating-stack guard ──► instantiate::<I>()
//!                                                       ├─ I::default()
//!                                                       ├─ inject(&bean)   (eager points resolve here)
//!                                                       └─ after_properties_set
//! ```
//!
//! ## Rules
//! - Every internal lock is released before a constructor or hook runs.
//! - `instantiate` never reads nor fills the singleton cache.
//! - A bean already under construction on the creating stack fails with
//!   [`BeanError::CircularDependency`].
//! - Cells record the injector weakly and never cache an `Inject<Injector>`,
//!   so beans cannot keep their injector alive.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::definition::{BeanDefinition, BindingInfo, BindingKind, BindingScope, Constructor, Erased};
use super::key::BeanKey;
use super::points::{InjectionPoint, InjectionPoints, InjectionTable};
use super::syntax::BindingSyntax;
use crate::core::{Config, RebindPolicy};
use crate::error::BeanError;

struct InjectorInner {
    config: Config,
    definitions: Mutex<HashMap<BeanKey, BeanDefinition>>,
    singletons: Mutex<HashMap<BeanKey, Erased>>,
    constructors: Mutex<HashMap<BeanKey, Constructor>>,
    tables: RwLock<HashMap<TypeId, Arc<InjectionTable>>>,
    creating: Mutex<Vec<BeanKey>>,
}

/// Binding resolver with singleton and prototype scopes.
///
/// Cheap to clone; clones share definitions and the singleton cache.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use beanwire::Injector;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// #[derive(Default)]
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// let injector = Injector::new();
/// injector.bind::<dyn Greeter>().to::<English>(|e| e).unwrap().as_prototype();
///
/// let a = injector.resolve::<dyn Greeter>().unwrap();
/// let b = injector.resolve::<dyn Greeter>().unwrap();
/// assert_eq!(a.greet(), "hello");
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

/// Non-owning handle kept by injection cells.
#[derive(Clone)]
pub(crate) struct WeakInjector(Weak<InjectorInner>);

impl WeakInjector {
    pub(crate) fn upgrade(&self) -> Option<Injector> {
        self.0.upgrade().map(|inner| Injector { inner })
    }
}

impl Injector {
    /// Creates an injector with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an injector with explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                config,
                definitions: Mutex::new(HashMap::new()),
                singletons: Mutex::new(HashMap::new()),
                constructors: Mutex::new(HashMap::new()),
                tables: RwLock::new(HashMap::new()),
                creating: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Configuration of this injector.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Starts (or resumes) the binding of type `T`.
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&self) -> BindingSyntax<'_, T> {
        self.bind_key(BeanKey::of::<T>())
    }

    /// Starts (or resumes) the binding of a named bean of type `T`.
    pub fn bind_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Arc<str>>,
    ) -> BindingSyntax<'_, T> {
        self.bind_key(BeanKey::named(name))
    }

    /// Starts (or resumes) the binding of `key`, whose beans are of type `T`.
    ///
    /// Binding an existing key returns a handle to the same definition.
    pub fn bind_key<T: ?Sized + Send + Sync + 'static>(&self, key: BeanKey) -> BindingSyntax<'_, T> {
        self.inner
            .definitions
            .lock()
            .entry(key.clone())
            .or_insert_with(BeanDefinition::unconfigured);
        BindingSyntax::new(self, key)
    }

    /// Resolves a concrete type, auto-wiring it as a singleton when unbound.
    ///
    /// ### Errors
    /// Any resolution error; see [`resolve_key`](Self::resolve_key).
    pub fn bean<T: Default + Send + Sync + 'static>(&self) -> Result<Arc<T>, BeanError> {
        self.register_constructor::<T>();
        self.resolve::<T>()
    }

    /// Resolves the binding of type `T` (concrete or trait object).
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BeanError> {
        self.resolve_key(&BeanKey::of::<T>())
    }

    /// Resolves a named bean of type `T`.
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Arc<str>>,
    ) -> Result<Arc<T>, BeanError> {
        self.resolve_key(&BeanKey::named(name))
    }

    /// Resolves `key` and returns its bean as `T`.
    ///
    /// ### Errors
    /// - [`BeanError::NoSuchBeanDefinition`] for an unbound key without a known constructor;
    /// - [`BeanError::Definition`] for a binding that was never configured;
    /// - [`BeanError::TypeMismatch`] if the bean is not a `T`;
    /// - [`BeanError::CircularDependency`] if creating the bean requires itself.
    pub fn resolve_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BeanKey,
    ) -> Result<Arc<T>, BeanError> {
        let erased = self.bean_erased(key)?;
        downcast::<T>(key, &erased)
    }

    /// Creates a new `T` with `Default`, injects it and runs its
    /// after-properties-set hook. The singleton cache is not involved.
    pub fn instantiate<T: Default + Send + Sync + 'static>(&self) -> Result<T, BeanError> {
        self.register_constructor::<T>();
        let bean = T::default();
        self.inject(&bean)?;
        Ok(bean)
    }

    /// Creates a new bean for `key` from its known constructor.
    ///
    /// ### Errors
    /// [`BeanError::NotConstructable`] if no constructor is known for `key`
    /// (trait objects, named keys, concrete types never seen by the injector).
    pub fn instantiate_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BeanKey,
    ) -> Result<Arc<T>, BeanError> {
        let construct = self
            .inner
            .constructors
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| BeanError::NotConstructable { key: key.clone() })?;
        let erased = self.construct(key, &construct)?;
        downcast::<T>(key, &erased)
    }

    /// Fills the injection points registered for the type of `target`.
    ///
    /// Eager points resolve now; lazy points record this injector and their
    /// key. A type without a registered table is left untouched.
    pub fn inject<T: 'static>(&self, target: &T) -> Result<(), BeanError> {
        let table = self.inner.tables.read().get(&TypeId::of::<T>()).cloned();
        match table {
            Some(table) => table.apply(target, self),
            None => Ok(()),
        }
    }

    /// Registers (or replaces) the injection table of `T`.
    pub fn register<T: 'static>(&self, points: InjectionPoints<T>) {
        self.inner
            .tables
            .write()
            .insert(TypeId::of::<T>(), Arc::new(points.into_table()));
    }

    /// Injection points registered for `T`.
    pub fn injection_points<T: 'static>(&self) -> Vec<InjectionPoint> {
        self.inner
            .tables
            .read()
            .get(&TypeId::of::<T>())
            .map(|table| table.points())
            .unwrap_or_default()
    }

    /// Returns `true` if a definition exists for `key`.
    pub fn is_bound(&self, key: &BeanKey) -> bool {
        self.inner.definitions.lock().contains_key(key)
    }

    /// Describes the definition of `key`.
    pub fn binding(&self, key: &BeanKey) -> Option<BindingInfo> {
        self.inner
            .definitions
            .lock()
            .get(key)
            .map(|definition| definition.describe(key))
    }

    /// Learns how to build `T` with `Default`; makes `T` auto-wirable.
    pub(crate) fn register_constructor<T: Default + Send + Sync + 'static>(&self) {
        self.inner
            .constructors
            .lock()
            .entry(BeanKey::of::<T>())
            .or_insert_with(|| {
                Arc::new(|injector: &Injector| {
                    let bean = injector.instantiate::<T>()?;
                    Ok(Arc::new(Arc::new(bean)) as Erased)
                })
            });
    }

    /// Sets the kind of an unconfigured definition.
    ///
    /// Returns `Ok(false)` when an existing configuration was kept.
    pub(crate) fn configure(&self, key: &BeanKey, kind: BindingKind) -> Result<bool, BeanError> {
        let mut definitions = self.inner.definitions.lock();
        let definition = definitions
            .entry(key.clone())
            .or_insert_with(BeanDefinition::unconfigured);
        if definition.kind.is_some() {
            return match self.inner.config.rebind {
                RebindPolicy::Reject => Err(BeanError::AlreadyBound { key: key.clone() }),
                RebindPolicy::Ignore => {
                    tracing::debug!(bean = %key, "binding already configured; kept");
                    Ok(false)
                }
            };
        }
        tracing::debug!(bean = %key, kind = ?kind.binding_type(), "bound");
        definition.kind = Some(kind);
        definition.implicit = false;
        Ok(true)
    }

    /// Binds `T` to a ready value, replacing any previous binding.
    pub(crate) fn define_constant<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        let definition = BeanDefinition {
            kind: Some(BindingKind::Constant(Arc::new(value))),
            scope: BindingScope::Singleton,
            implicit: false,
        };
        self.inner
            .definitions
            .lock()
            .insert(BeanKey::of::<T>(), definition);
    }

    /// Binds `T` as a prototype built by `factory`, replacing any previous binding.
    pub(crate) fn define_prototype<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = BeanKey::of::<T>();
        let construct: Constructor = Arc::new(move |injector: &Injector| {
            let bean = factory();
            injector.inject(&bean)?;
            Ok(Arc::new(Arc::new(bean)) as Erased)
        });
        let definition = BeanDefinition {
            kind: Some(BindingKind::Implementation {
                implementation: key.clone(),
                construct,
            }),
            scope: BindingScope::Prototype,
            implicit: false,
        };
        self.inner.definitions.lock().insert(key, definition);
    }

    pub(crate) fn set_scope(&self, key: &BeanKey, scope: BindingScope) {
        if let Some(definition) = self.inner.definitions.lock().get_mut(key) {
            definition.scope = scope;
        }
    }

    pub(crate) fn downgrade(&self) -> WeakInjector {
        WeakInjector(Arc::downgrade(&self.inner))
    }

    /// Resolves `key` to its erased bean, honoring scope.
    fn bean_erased(&self, key: &BeanKey) -> Result<Erased, BeanError> {
        if *key == BeanKey::of::<Injector>() {
            return Ok(Arc::new(Arc::new(self.clone())) as Erased);
        }
        let (kind, scope) = self.definition_of(key)?;
        match scope {
            BindingScope::Singleton => {
                if let Some(found) = self.inner.singletons.lock().get(key) {
                    return Ok(Arc::clone(found));
                }
                let created = self.create(key, &kind)?;
                let mut singletons = self.inner.singletons.lock();
                Ok(Arc::clone(singletons.entry(key.clone()).or_insert(created)))
            }
            BindingScope::Prototype => self.create(key, &kind),
        }
    }

    /// Looks up (or auto-wires) the definition of `key`.
    fn definition_of(&self, key: &BeanKey) -> Result<(BindingKind, BindingScope), BeanError> {
        let mut definitions = self.inner.definitions.lock();
        if let Some(definition) = definitions.get(key) {
            let kind = definition.kind.clone().ok_or_else(|| BeanError::Definition {
                key: key.clone(),
                reason: "binding has neither an implementation nor a constant".into(),
            })?;
            return Ok((kind, definition.scope));
        }

        let construct = if self.inner.config.auto_wire {
            self.inner.constructors.lock().get(key).cloned()
        } else {
            None
        };
        let Some(construct) = construct else {
            return Err(BeanError::NoSuchBeanDefinition { key: key.clone() });
        };
        let kind = BindingKind::Implementation {
            implementation: key.clone(),
            construct,
        };
        definitions.insert(key.clone(), BeanDefinition::implicit(kind.clone()));
        tracing::debug!(bean = %key, "auto-wired as singleton");
        Ok((kind, BindingScope::Singleton))
    }

    fn create(&self, key: &BeanKey, kind: &BindingKind) -> Result<Erased, BeanError> {
        match kind {
            BindingKind::Constant(value) => Ok(Arc::clone(value)),
            BindingKind::Implementation { construct, .. } => self.construct(key, construct),
        }
    }

    fn construct(&self, key: &BeanKey, construct: &Constructor) -> Result<Erased, BeanError> {
        let _guard = CreationGuard::enter(&self.inner, key)?;
        construct(self)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("definitions", &self.inner.definitions.lock().len())
            .field("singletons", &self.inner.singletons.lock().len())
            .finish()
    }
}

/// Keeps `key` on the creating stack while its constructor runs.
struct CreationGuard<'a> {
    inner: &'a InjectorInner,
}

impl<'a> CreationGuard<'a> {
    fn enter(inner: &'a InjectorInner, key: &BeanKey) -> Result<Self, BeanError> {
        let mut creating = inner.creating.lock();
        if let Some(pos) = creating.iter().position(|k| k == key) {
            let mut chain = creating[pos..].to_vec();
            chain.push(key.clone());
            return Err(BeanError::CircularDependency { chain });
        }
        creating.push(key.clone());
        Ok(Self { inner })
    }
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.inner.creating.lock().pop();
    }
}

fn downcast<T: ?Sized + Send + Sync + 'static>(
    key: &BeanKey,
    erased: &Erased,
) -> Result<Arc<T>, BeanError> {
    erased
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| BeanError::TypeMismatch {
            key: key.clone(),
            expected: std::any::type_name::<T>(),
        })
}
