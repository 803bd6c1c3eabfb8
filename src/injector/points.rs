//! # Per-type injection tables.
//!
//! An [`InjectionPoints<T>`] lists the [`Inject`] fields of `T` together with
//! the key each one wants and whether it resolves eagerly. The application
//! registers one table per type at start-up; [`Injector::inject`] walks it.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use beanwire::{Inject, InjectionPoints, Injector};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! #[derive(Default)]
//! struct Report {
//!     clock: Inject<Clock>,
//! }
//!
//! let injector = Injector::new();
//! injector.bind::<Clock>().to_self().unwrap();
//! injector.register(InjectionPoints::<Report>::new().lazy("clock", |r| &r.clock));
//!
//! let report = injector.instantiate::<Report>().unwrap();
//! assert!(!report.clock.is_resolved());
//! let clock: Arc<Clock> = report.clock.get().unwrap();
//! assert!(Arc::ptr_eq(&clock, &injector.bean::<Clock>().unwrap()));
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use super::inject::Inject;
use super::injector::Injector;
use super::key::BeanKey;
use crate::error::BeanError;

type Apply = Arc<dyn Fn(&dyn Any, &Injector) -> Result<(), BeanError> + Send + Sync>;
type Hook = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Description of one injection point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPoint {
    /// Field name, for diagnostics.
    pub name: &'static str,
    /// Identity to resolve.
    pub key: BeanKey,
    /// Resolved on first access rather than during `inject`.
    pub lazy: bool,
}

/// Injection table of type `T`.
#[must_use = "the table has no effect until passed to `Injector::register`"]
pub struct InjectionPoints<T> {
    points: Vec<(InjectionPoint, Apply)>,
    after_properties_set: Option<Hook>,
    _owner: PhantomData<fn(&T)>,
}

impl<T: 'static> InjectionPoints<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            after_properties_set: None,
            _owner: PhantomData,
        }
    }

    /// Field resolved during `inject`.
    pub fn eager<D, F>(self, name: &'static str, field: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        self.point(name, BeanKey::of::<D>(), false, None, field)
    }

    /// Field resolved on its first `get()`.
    pub fn lazy<D, F>(self, name: &'static str, field: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        self.point(name, BeanKey::of::<D>(), true, None, field)
    }

    /// Eager field bound to an explicit key.
    pub fn eager_key<D, F>(self, name: &'static str, key: BeanKey, field: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        self.point(name, key, false, None, field)
    }

    /// Lazy field bound to an explicit key.
    pub fn lazy_key<D, F>(self, name: &'static str, key: BeanKey, field: F) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        self.point(name, key, true, None, field)
    }

    /// Eager field on a concrete type that is auto-wired when unbound.
    ///
    /// `D`'s constructor is made known to the injector before the field is
    /// resolved, so an unbound `D` becomes an implicit singleton.
    pub fn eager_bean<D, F>(self, name: &'static str, field: F) -> Self
    where
        D: Default + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        let prepare: fn(&Injector) = Injector::register_constructor::<D>;
        self.point(name, BeanKey::of::<D>(), false, Some(prepare), field)
    }

    /// Lazy field on a concrete type that is auto-wired when unbound.
    pub fn lazy_bean<D, F>(self, name: &'static str, field: F) -> Self
    where
        D: Default + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        let prepare: fn(&Injector) = Injector::register_constructor::<D>;
        self.point(name, BeanKey::of::<D>(), true, Some(prepare), field)
    }

    /// Hook run after every point of an injected `T` has been processed.
    pub fn after_properties_set(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.after_properties_set = Some(Arc::new(move |bean: &dyn Any| {
            if let Some(bean) = bean.downcast_ref::<T>() {
                hook(bean);
            }
        }));
        self
    }

    /// Declared points, in declaration order.
    pub fn points(&self) -> impl Iterator<Item = &InjectionPoint> {
        self.points.iter().map(|(point, _)| point)
    }

    fn point<D, F>(
        mut self,
        name: &'static str,
        key: BeanKey,
        lazy: bool,
        prepare: Option<fn(&Injector)>,
        field: F,
    ) -> Self
    where
        D: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a T) -> &'a Inject<D> + Send + Sync + 'static,
    {
        let source = key.clone();
        let apply: Apply = Arc::new(move |bean: &dyn Any, injector: &Injector| {
            let Some(bean) = bean.downcast_ref::<T>() else {
                return Ok(());
            };
            if let Some(prepare) = prepare {
                prepare(injector);
            }
            let cell = field(bean);
            cell.bind_source(injector, source.clone());
            if !lazy {
                cell.get()?;
            }
            Ok(())
        });
        self.points.push((InjectionPoint { name, key, lazy }, apply));
        self
    }

    pub(crate) fn into_table(self) -> InjectionTable {
        InjectionTable {
            owner: std::any::type_name::<T>(),
            points: self.points,
            after_properties_set: self.after_properties_set,
        }
    }
}

impl<T: 'static> Default for InjectionPoints<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased table stored by the injector.
pub(crate) struct InjectionTable {
    owner: &'static str,
    points: Vec<(InjectionPoint, Apply)>,
    after_properties_set: Option<Hook>,
}

impl InjectionTable {
    /// Fills every point of `bean`, then runs the hook.
    pub(crate) fn apply(&self, bean: &dyn Any, injector: &Injector) -> Result<(), BeanError> {
        for (point, apply) in &self.points {
            tracing::trace!(owner = self.owner, point = point.name, lazy = point.lazy, "inject");
            apply(bean, injector)?;
        }
        if let Some(hook) = &self.after_properties_set {
            hook(bean);
        }
        Ok(())
    }

    pub(crate) fn points(&self) -> Vec<InjectionPoint> {
        self.points.iter().map(|(point, _)| point.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Clock;

    #[derive(Default)]
    struct Report {
        clock: Inject<Clock>,
    }

    #[test]
    fn test_plain_point_on_unbound_type_fails() {
        let injector = Injector::new();
        injector.register(InjectionPoints::<Report>::new().eager("clock", |r| &r.clock));
        let err = injector.instantiate::<Report>().err().unwrap();
        assert!(matches!(err, BeanError::NoSuchBeanDefinition { .. }));
    }

    #[test]
    fn test_eager_bean_point_autowires_unbound_type() {
        let injector = Injector::new();
        injector.register(InjectionPoints::<Report>::new().eager_bean("clock", |r| &r.clock));

        let report = injector.instantiate::<Report>().unwrap();
        assert!(report.clock.is_resolved());
        let clock = report.clock.get().unwrap();
        assert!(Arc::ptr_eq(&clock, &injector.bean::<Clock>().unwrap()));
        assert!(injector.is_bound(&BeanKey::of::<Clock>()));
    }

    #[test]
    fn test_lazy_bean_point_autowires_on_first_get() {
        let injector = Injector::new();
        injector.register(InjectionPoints::<Report>::new().lazy_bean("clock", |r| &r.clock));

        let first = injector.instantiate::<Report>().unwrap();
        let second = injector.instantiate::<Report>().unwrap();
        assert!(!first.clock.is_resolved());
        assert!(Arc::ptr_eq(&first.clock.get().unwrap(), &second.clock.get().unwrap()));
    }
}
