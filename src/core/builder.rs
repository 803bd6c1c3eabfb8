use std::sync::Arc;

use super::config::Config;
use super::context::Context;
use crate::events::EventBus;
use crate::injector::Injector;
use crate::lifecycle::{default_handler, FailureHandler};
use crate::linker::EventLinker;

/// Builder for constructing a [`Context`] with optional features.
pub struct ContextBuilder {
    cfg: Config,
    handler: Option<Arc<dyn FailureHandler>>,
}

impl ContextBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg, handler: None }
    }

    /// Sets the sink for listener failures of the context bus and linkers.
    ///
    /// Without it, failures are logged through `tracing`.
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Builds and returns the Context.
    ///
    /// This consumes the builder and initializes:
    /// - the event bus, bound in the injector as a constant;
    /// - the injector, which binds `EventLinker` as a prototype.
    pub fn build(self) -> Context {
        let handler = self.handler.unwrap_or_else(default_handler);
        let bus = EventBus::from_config(&self.cfg, Arc::clone(&handler));
        let injector = Injector::with_config(self.cfg.clone());

        injector.define_constant(Arc::new(bus.clone()));
        injector.define_prototype(move || EventLinker::with_handler(Arc::clone(&handler)));

        Context::from_parts(injector, bus, self.cfg)
    }
}
