//! Shallow partial updates.
//!
//! A [`Patch`] says explicitly how the partial value is obtained: given as
//! is, or picked from the previous state. The state type decides how a
//! partial value is assigned by implementing [`Merge`].

/// Shallow assignment of a partial value `P` onto a state.
///
/// Every state merges a whole value of itself by replacement.
pub trait Merge<P> {
    /// Assigns the fields present in `patch`.
    fn merge(&mut self, patch: P);
}

impl<S> Merge<S> for S {
    fn merge(&mut self, patch: S) {
        *self = patch;
    }
}

/// Selector of the partial value passed to [`Store::patch`](crate::Store::patch).
pub enum Patch<S, P> {
    /// Merge this value.
    Values(P),
    /// Compute the value from the previous state; `None` leaves the state
    /// untouched and notifies nobody.
    Pick(Box<dyn FnOnce(&S) -> Option<P> + Send>),
}

impl<S, P> Patch<S, P> {
    /// Shorthand for [`Patch::Pick`].
    pub fn pick(f: impl FnOnce(&S) -> Option<P> + Send + 'static) -> Self {
        Patch::Pick(Box::new(f))
    }
}

impl<S, P: std::fmt::Debug> std::fmt::Debug for Patch<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Patch::Values(p) => f.debug_tuple("Values").field(p).finish(),
            Patch::Pick(_) => f.write_str("Pick(..)"),
        }
    }
}
