//! Subscription grouping for bulk teardown.
//!
//! - [`EventLinker`] records bus subscriptions, raw container listeners and store bindings
//! - [`LinkedConfigurer`], [`LinkedBinding`] the recorded counterparts of the bus handles
//! - [`Teardown`] the handle seam the linker destroys through

#[allow(clippy::module_inception)]
mod linker;

pub use linker::{EventLinker, LinkedBinding, LinkedConfigurer, Teardown};
