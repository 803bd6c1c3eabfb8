//! # Typed event identities.
//!
//! An [`EventKey<A>`] names an event and fixes its payload type `A` at compile time.
//! Two keys with the same name address the same listener list; the payload type
//! only guards what `emit` and `listen` accept.
//!
//! ## Example
//! ```rust
//! use beanwire::EventKey;
//!
//! const SAVED: EventKey<(u32, String)> = EventKey::new("document.saved");
//! assert_eq!(SAVED.name(), "document.saved");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

/// Event identity carrying its payload type.
pub struct EventKey<A> {
    name: Cow<'static, str>,
    _payload: PhantomData<fn(&A)>,
}

impl<A> EventKey<A> {
    /// Creates a key from a static name (usable in `const` items).
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _payload: PhantomData,
        }
    }

    /// Creates a key from a runtime-built name.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            _payload: PhantomData,
        }
    }

    /// Returns the event tag.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A> Clone for EventKey<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _payload: PhantomData,
        }
    }
}

impl<A> PartialEq for EventKey<A> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<A> Eq for EventKey<A> {}

impl<A> fmt::Debug for EventKey<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKey").field(&self.name).finish()
    }
}

impl<A> fmt::Display for EventKey<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
