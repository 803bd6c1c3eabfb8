//! # Transceiver base.
//!
//! [`Transceiver`] is embedded by components that talk to the application
//! through the context bus. It gets the bus and its own linker by lazy
//! injection and owns a list of disposables.
//!
//! ## Teardown order
//! ```text
//! destroy()
//!   ├──► linker.remove_listeners()   (only if the linker was ever resolved)
//!   └──► destroy_all(disposables)    (failures → BeanDestroyErrorHandler)
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use super::disposable::{destroy_all, BeanDestroyErrorHandler, DisposableBean, LogDestroyErrors};
use crate::error::{BeanError, BoxError};
use crate::events::{EventBus, EventKey, Listener, Target};
use crate::injector::{Inject, InjectionPoints};
use crate::linker::{EventLinker, LinkedConfigurer};

/// Embeddable base for components communicating via events.
///
/// # Example
/// ```rust
/// use beanwire::{Config, Context, EventKey, Transceiver};
///
/// const SAVED: EventKey<u32> = EventKey::new("saved");
///
/// #[derive(Default)]
/// struct Editor {
///     base: Transceiver,
/// }
///
/// let context = Context::builder(Config::default()).build();
/// context
///     .injector()
///     .register(Transceiver::points(|e: &Editor| &e.base));
///
/// let editor = context.injector().instantiate::<Editor>().unwrap();
/// editor.base.listen_context(&SAVED).unwrap().by(|id| println!("saved {id}"));
/// editor.base.dispatch(&SAVED, &7).unwrap();
///
/// editor.base.destroy();
/// assert!(!context.bus().has_listeners(&SAVED));
/// ```
#[derive(Default)]
pub struct Transceiver {
    bus: Inject<EventBus>,
    linker: Inject<EventLinker>,
    disposables: Mutex<Vec<Arc<dyn DisposableBean>>>,
}

impl Transceiver {
    /// Injection table for an owner type embedding a `Transceiver`.
    ///
    /// Further points of the owner can be chained on the returned table.
    pub fn points<T, F>(base: F) -> InjectionPoints<T>
    where
        T: 'static,
        F: for<'a> Fn(&'a T) -> &'a Transceiver + Clone + Send + Sync + 'static,
    {
        let linker = base.clone();
        InjectionPoints::new()
            .lazy("bus", move |owner: &T| &base(owner).bus)
            .lazy("linker", move |owner: &T| &linker(owner).linker)
    }

    /// The context bus.
    pub fn bus(&self) -> Result<Arc<EventBus>, BeanError> {
        self.bus.get()
    }

    /// The linker owned by this component.
    pub fn linker(&self) -> Result<Arc<EventLinker>, BeanError> {
        self.linker.get()
    }

    /// Emits one event on the context bus.
    pub fn dispatch<A: 'static>(&self, key: &EventKey<A>, args: &A) -> Result<(), BeanError> {
        self.bus()?.emit(key, args);
        Ok(())
    }

    /// Emits several events with the same arguments.
    pub fn multicast<A: 'static>(&self, keys: &[EventKey<A>], args: &A) -> Result<(), BeanError> {
        let bus = self.bus()?;
        for key in keys {
            bus.emit(key, args);
        }
        Ok(())
    }

    /// Emits the event `reduce` derives from every item.
    pub fn multicast_reduce<U, A, I, F>(&self, items: I, reduce: F, args: &A) -> Result<(), BeanError>
    where
        A: 'static,
        I: IntoIterator<Item = U>,
        F: Fn(U) -> EventKey<A>,
    {
        let bus = self.bus()?;
        for item in items {
            bus.emit(&reduce(item), args);
        }
        Ok(())
    }

    /// Subscribes to a context event through the linker.
    pub fn listen_context<A: 'static>(&self, key: &EventKey<A>) -> Result<LinkedConfigurer<A>, BeanError> {
        let bus = self.bus()?;
        Ok(self.linker()?.listen(&*bus, key))
    }

    /// Adds a raw context listener through the linker.
    pub fn add_context_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) -> Result<(), BeanError> {
        let bus = self.bus()?;
        self.linker()?.add_listener(&*bus, key, listener, target);
        Ok(())
    }

    /// Removes a raw context listener added with [`add_context_listener`](Self::add_context_listener).
    pub fn remove_context_listener<A: 'static>(
        &self,
        key: &EventKey<A>,
        listener: &Listener<A>,
        target: Option<&Target>,
    ) -> Result<(), BeanError> {
        let bus = self.bus()?;
        self.linker()?.remove_listener(&*bus, key, listener, target);
        Ok(())
    }

    /// Hands `disposable` over; it is destroyed with this component.
    pub fn own(&self, disposable: Arc<dyn DisposableBean>) {
        self.disposables.lock().push(disposable);
    }

    /// Removes every subscription made through the linker.
    ///
    /// Does not resolve the linker if nothing ever used it.
    pub fn remove_listeners(&self) {
        if let Some(linker) = self.linker.peek() {
            linker.remove_listeners();
        }
    }

    /// Destroys owned disposables, reporting failures to `handler`.
    pub fn dispose(&self, handler: &dyn BeanDestroyErrorHandler) {
        let owned = std::mem::take(&mut *self.disposables.lock());
        destroy_all(&owned, handler);
    }

    /// Tears the component down: listeners first, then disposables (logged failures).
    pub fn destroy(&self) {
        self.destroy_with(&LogDestroyErrors);
    }

    /// Same as [`destroy`](Self::destroy) with an explicit error sink.
    pub fn destroy_with(&self, handler: &dyn BeanDestroyErrorHandler) {
        self.remove_listeners();
        self.dispose(handler);
    }
}

impl DisposableBean for Transceiver {
    fn destroy(&self) -> Result<(), BoxError> {
        Transceiver::destroy(self);
        Ok(())
    }
}

impl std::fmt::Debug for Transceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transceiver")
            .field("bus", &self.bus)
            .field("linker", &self.linker)
            .field("disposables", &self.disposables.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::injector::Injector;

    const SAVED: EventKey<u32> = EventKey::new("saved");
    const CLOSED: EventKey<u32> = EventKey::new("closed");

    #[derive(Default)]
    struct Panel {
        base: Transceiver,
    }

    fn injector_with_bus() -> (Injector, EventBus) {
        let injector = Injector::new();
        let bus = EventBus::new();
        injector.bind::<EventBus>().to_constant(bus.clone()).unwrap();
        injector.bind::<EventLinker>().to_self().unwrap().as_prototype();
        injector.register(Transceiver::points(|p: &Panel| &p.base));
        (injector, bus)
    }

    /// Disposable that records how many listeners were still on the bus.
    struct Probe {
        bus: EventBus,
        seen: Arc<AtomicUsize>,
    }

    impl DisposableBean for Probe {
        fn destroy(&self) -> Result<(), BoxError> {
            self.seen
                .store(self.bus.listener_count(&SAVED) + 1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_destroy_removes_listeners_before_disposing() {
        let (injector, bus) = injector_with_bus();
        let panel = injector.instantiate::<Panel>().unwrap();

        panel.base.listen_context(&SAVED).unwrap().by(|_| {});
        let raw = Listener::new(|_: &u32| {});
        panel.base.add_context_listener(&SAVED, &raw, None).unwrap();
        assert_eq!(bus.listener_count(&SAVED), 2);

        let seen = Arc::new(AtomicUsize::new(0));
        panel.base.own(Arc::new(Probe {
            bus: bus.clone(),
            seen: Arc::clone(&seen),
        }));

        panel.base.destroy();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(&SAVED), 0);
        panel.base.destroy();
    }

    #[test]
    fn test_each_component_gets_its_own_linker() {
        let (injector, bus) = injector_with_bus();
        let a = injector.instantiate::<Panel>().unwrap();
        let b = injector.instantiate::<Panel>().unwrap();
        a.base.listen_context(&SAVED).unwrap().by(|_| {});
        b.base.listen_context(&SAVED).unwrap().by(|_| {});

        a.base.destroy();
        assert_eq!(bus.listener_count(&SAVED), 1);
        b.base.destroy();
        assert_eq!(bus.listener_count(&SAVED), 0);
    }

    #[test]
    fn test_destroy_without_linker_use_does_not_resolve_it() {
        let (injector, _bus) = injector_with_bus();
        let panel = injector.instantiate::<Panel>().unwrap();
        panel.base.destroy();
        assert!(panel.base.linker.peek().is_none());
    }

    #[test]
    fn test_dispatch_and_multicast() {
        let (injector, bus) = injector_with_bus();
        let panel = injector.instantiate::<Panel>().unwrap();
        let total = Arc::new(AtomicUsize::new(0));
        for key in [&SAVED, &CLOSED] {
            let total = Arc::clone(&total);
            bus.listen(key).by(move |n| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
            });
        }

        panel.base.dispatch(&SAVED, &1).unwrap();
        panel.base.multicast(&[SAVED, CLOSED], &10).unwrap();
        panel
            .base
            .multicast_reduce(["saved", "closed"], EventKey::<u32>::new, &100)
            .unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 221);
    }

    #[test]
    fn test_uninjected_transceiver_reports_unresolved() {
        let base = Transceiver::default();
        assert!(matches!(
            base.dispatch(&SAVED, &1),
            Err(BeanError::Unresolved { .. })
        ));
        base.destroy();
    }

    #[test]
    fn test_remove_context_listener() {
        let (injector, bus) = injector_with_bus();
        let panel = injector.instantiate::<Panel>().unwrap();
        let raw = Listener::new(|_: &u32| {});
        let target = Target::new(1u8);
        panel.base.add_context_listener(&SAVED, &raw, Some(&target)).unwrap();
        panel.base.remove_context_listener(&SAVED, &raw, Some(&target)).unwrap();
        assert_eq!(bus.listener_count(&SAVED), 0);
        assert!(panel.base.linker().unwrap().is_empty());
    }
}
