//! Error types used by the injector and the teardown paths.
//!
//! This module defines:
//!
//! - [`BeanError`]: definition and creation errors raised while binding or resolving beans.
//! - [`BoxError`]: the boxed error a [`DisposableBean`](crate::DisposableBean) may fail with.
//!
//! Listener failures are not errors in this sense: they never propagate and are
//! reported through [`FailureHandler`](crate::FailureHandler) instead.

use std::any::Any;

use thiserror::Error;

use crate::injector::BeanKey;

/// Boxed error returned by disposables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the injector.
///
/// All of them represent configuration or programming mistakes and are
/// propagated to the immediate caller of `bind`, `bean`, `resolve` or `instantiate`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeanError {
    /// No binding exists for the key and no constructor is known for it.
    #[error("no qualifying bean of type '{key}' available")]
    NoSuchBeanDefinition {
        /// The unresolved identity.
        key: BeanKey,
    },

    /// The binding exists but is malformed (e.g. never configured).
    #[error("invalid bean definition for '{key}': {reason}")]
    Definition {
        /// The identity of the malformed binding.
        key: BeanKey,
        /// What is wrong with it.
        reason: String,
    },

    /// The key does not name a constructable type.
    #[error("unable to instantiate '{key}' because it is not a constructable type")]
    NotConstructable {
        /// The identity that was asked to be constructed.
        key: BeanKey,
    },

    /// A configured binding was configured a second time.
    #[error("bean '{key}' is already bound")]
    AlreadyBound {
        /// The identity bound twice.
        key: BeanKey,
    },

    /// The bound value is not of the requested type.
    #[error("bean '{key}' is not of the requested type '{expected}'")]
    TypeMismatch {
        /// The resolved identity.
        key: BeanKey,
        /// Name of the type the caller asked for.
        expected: &'static str,
    },

    /// Creating a bean required the same bean again.
    #[error("circular dependency: {}", format_chain(.chain))]
    CircularDependency {
        /// Keys under construction, outermost first, ending with the repeated key.
        chain: Vec<BeanKey>,
    },

    /// An injection cell was read before any injector filled it, or its injector is gone.
    #[error("injection point of type '{expected}' is not bound to a live injector")]
    Unresolved {
        /// Name of the type held by the cell.
        expected: &'static str,
    },
}

impl BeanError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use beanwire::{BeanError, BeanKey};
    ///
    /// let err = BeanError::NoSuchBeanDefinition { key: BeanKey::named("clock") };
    /// assert_eq!(err.as_label(), "bean_no_such_definition");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BeanError::NoSuchBeanDefinition { .. } => "bean_no_such_definition",
            BeanError::Definition { .. } => "bean_definition_invalid",
            BeanError::NotConstructable { .. } => "bean_not_constructable",
            BeanError::AlreadyBound { .. } => "bean_already_bound",
            BeanError::TypeMismatch { .. } => "bean_type_mismatch",
            BeanError::CircularDependency { .. } => "bean_circular_dependency",
            BeanError::Unresolved { .. } => "bean_unresolved",
        }
    }

    /// Returns the identity the error is about, if it names one.
    pub fn bean_key(&self) -> Option<&BeanKey> {
        match self {
            BeanError::NoSuchBeanDefinition { key }
            | BeanError::Definition { key, .. }
            | BeanError::NotConstructable { key }
            | BeanError::AlreadyBound { key }
            | BeanError::TypeMismatch { key, .. } => Some(key),
            BeanError::CircularDependency { chain } => chain.last(),
            BeanError::Unresolved { .. } => None,
        }
    }
}

fn format_chain(chain: &[BeanKey]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let key = BeanKey::named("clock");
        assert_eq!(
            BeanError::AlreadyBound { key: key.clone() }.as_label(),
            "bean_already_bound"
        );
        assert_eq!(
            BeanError::NotConstructable { key }.as_label(),
            "bean_not_constructable"
        );
    }

    #[test]
    fn test_circular_dependency_message_lists_chain() {
        let err = BeanError::CircularDependency {
            chain: vec![BeanKey::named("a"), BeanKey::named("b"), BeanKey::named("a")],
        };
        assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
        assert_eq!(err.bean_key(), Some(&BeanKey::named("a")));
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
