//! # Listener and target identities.
//!
//! Closures have no usable identity, so removal APIs work on shared handles:
//! - [`Listener<A>`] wraps a callback in an `Arc`; clones compare equal.
//! - [`Target`] is an opaque invocation context used only to tell apart
//!   several registrations of the same listener.
//!
//! Both compare by pointer, never by value.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared event callback compared by identity.
pub struct Listener<A> {
    func: Arc<dyn Fn(&A) + Send + Sync>,
}

impl<A> Listener<A> {
    /// Wraps a callback.
    pub fn new(func: impl Fn(&A) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
        }
    }

    #[inline]
    pub(crate) fn call(&self, args: &A) {
        (self.func)(args)
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.func) as *const () as usize
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:#x})", self.id())
    }
}

/// Opaque invocation context compared by identity.
///
/// A registration made with `Some(target)` is only removed by a call passing
/// the same target; a registration made with `None` only by a call passing `None`.
#[derive(Clone)]
pub struct Target {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Target {
    /// Allocates a fresh target owning `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Uses an existing shared object as the target.
    pub fn of<T: Any + Send + Sync>(shared: &Arc<T>) -> Self {
        Self {
            inner: Arc::clone(shared) as Arc<dyn Any + Send + Sync>,
        }
    }

    /// Borrows the target as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Target {}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({:#x})", self.addr())
    }
}

/// Compares two optional targets by identity.
#[inline]
pub(crate) fn same_target(a: Option<&Target>, b: Option<&Target>) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_identity_follows_clones() {
        let a = Listener::<u32>::new(|_| {});
        let b = Listener::<u32>::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_target_identity() {
        let shared = Arc::new(5u8);
        let t1 = Target::of(&shared);
        let t2 = Target::of(&shared);
        let t3 = Target::new(5u8);
        assert_eq!(t1, t2);
        assert_ne!(t1, t3);
        assert_eq!(t3.downcast_ref::<u8>(), Some(&5));
        assert!(same_target(None, None));
        assert!(!same_target(Some(&t1), None));
    }
}
