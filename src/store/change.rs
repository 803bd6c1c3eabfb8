/// Outcome of a store mutation.
///
/// Mutations return anything convertible into `Change`: `()` and `true` mean
/// the state changed, `false` keeps the change without notifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Listeners are notified.
    Changed,
    /// The mutated copy is stored silently; nobody is notified.
    Unchanged,
}

impl Change {
    /// Returns `true` for [`Change::Changed`].
    #[inline]
    pub fn is_changed(self) -> bool {
        matches!(self, Change::Changed)
    }
}

impl From<()> for Change {
    fn from(_: ()) -> Self {
        Change::Changed
    }
}

impl From<bool> for Change {
    fn from(changed: bool) -> Self {
        if changed {
            Change::Changed
        } else {
            Change::Unchanged
        }
    }
}
