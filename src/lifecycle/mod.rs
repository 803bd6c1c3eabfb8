//! Lifecycle: failure sinks, disposable beans and the transceiver base.
//!
//! ## Contents
//! - [`Failure`], [`FailureHandler`], [`LogFailures`], [`Stage`] contained listener failures
//! - [`DisposableBean`], [`BeanDestroyErrorHandler`], [`destroy_all`] teardown of owned resources
//! - [`Transceiver`] embeddable base wiring a component to the context bus

mod disposable;
mod failure;
mod transceiver;

pub use disposable::{destroy_all, BeanDestroyErrorHandler, DisposableBean, LogDestroyErrors};
pub use failure::{Failure, FailureHandler, LogFailures, Stage};
pub use transceiver::Transceiver;

pub(crate) use failure::default_handler;

#[cfg(test)]
pub(crate) use failure::testing;
