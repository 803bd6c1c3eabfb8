use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::store::StoreInner;

/// Handle of one store listener registration.
///
/// Goes from active to destroyed exactly once, through [`destroy`](Self::destroy)
/// or [`Store::off`](crate::Store::off).
pub struct StoreBinding<S> {
    store: Weak<StoreInner<S>>,
    id: u64,
    active: Arc<AtomicBool>,
}

impl<S> StoreBinding<S> {
    pub(crate) fn new(store: Weak<StoreInner<S>>, id: u64, active: Arc<AtomicBool>) -> Self {
        Self { store, id, active }
    }

    /// Unregisters the listener. Idempotent.
    pub fn destroy(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(store) = self.store.upgrade() {
            store.remove_by_id(self.id);
        }
    }

    /// Returns `true` until destroyed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<S> Clone for StoreBinding<S> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
            id: self.id,
            active: Arc::clone(&self.active),
        }
    }
}

impl<S> std::fmt::Debug for StoreBinding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBinding")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
