//! Runtime core: configuration and the application context.
//!
//! The public API of this module is [`Context`], built through
//! [`ContextBuilder`] from a [`Config`].
//!
//! Internal modules:
//! - `config`: [`Config`] and [`RebindPolicy`];
//! - `context`: the context owning the injector and the bus;
//! - `builder`: wiring of bus, injector and default bindings.

mod builder;
mod config;
mod context;

pub use builder::ContextBuilder;
pub use config::{Config, RebindPolicy};
pub use context::Context;
