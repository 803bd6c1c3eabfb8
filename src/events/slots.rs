//! # Reentrancy-safe slot list.
//!
//! [`SlotList`] is the per-event storage of the bus. Removal while an emission is
//! running leaves a tombstone instead of shifting elements, so the indices the
//! running pass walks stay valid.
//!
//! ```text
//! emit ──► lock += 1 ──► walk 0..len ──► lock -= 1 ──► lock == 0 && dirty ? compact
//!                          │
//!                          └─ remove(i) ──► slots[i] = None, dirty = true
//! ```
//!
//! ## Rules
//! - Slots are never moved while `lock > 0`; appends are allowed and land past
//!   the length captured by the running pass.
//! - Compaction keeps the relative order of live slots.

/// Tombstoned vector with a reentrancy lock.
#[derive(Debug)]
pub(crate) struct SlotList<T> {
    slots: Vec<Option<T>>,
    lock: usize,
    dirty: bool,
}

impl<T> SlotList<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            lock: 0,
            dirty: false,
        }
    }

    /// Physical length, tombstones included.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots.
    pub(crate) fn live(&self) -> usize {
        self.iter().count()
    }

    #[inline]
    pub(crate) fn is_locked(&self) -> bool {
        self.lock > 0
    }

    pub(crate) fn push(&mut self, item: T) {
        self.slots.push(Some(item));
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    /// Tombstones the slot at `index` and returns its item.
    pub(crate) fn take(&mut self, index: usize) -> Option<T> {
        let item = self.slots.get_mut(index).and_then(Option::take);
        if item.is_some() {
            self.dirty = true;
        }
        item
    }

    /// Tombstones every slot matching `pred` and returns the removed items.
    pub(crate) fn take_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut taken = Vec::new();
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(&mut pred) {
                taken.extend(slot.take());
            }
        }
        if !taken.is_empty() {
            self.dirty = true;
        }
        self.tidy();
        taken
    }

    pub(crate) fn lock(&mut self) {
        self.lock += 1;
    }

    pub(crate) fn unlock(&mut self) {
        self.lock = self.lock.saturating_sub(1);
        self.tidy();
    }

    /// Drops tombstones unless locked or already clean.
    pub(crate) fn tidy(&mut self) {
        if self.lock > 0 || !self.dirty {
            return;
        }
        self.slots.retain(Option::is_some);
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_while_locked_keeps_indices() {
        let mut list = SlotList::with_capacity(4);
        list.push('a');
        list.push('b');
        list.push('c');

        list.lock();
        assert_eq!(list.take(1), Some('b'));
        list.tidy();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get_mut(2), Some(&mut 'c'));

        list.unlock();
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec!['a', 'c']);
    }

    #[test]
    fn test_nested_lock_defers_until_outermost_unlock() {
        let mut list = SlotList::with_capacity(2);
        list.push(1);
        list.push(2);
        list.lock();
        list.lock();
        list.take(0);
        list.unlock();
        assert_eq!(list.len(), 2);
        list.unlock();
        assert_eq!(list.len(), 1);
        assert!(!list.is_locked());
    }

    #[test]
    fn test_take_where_compacts_when_unlocked() {
        let mut list = SlotList::with_capacity(4);
        for n in 0..5 {
            list.push(n);
        }
        let taken = list.take_where(|n| n % 2 == 0);
        assert_eq!(taken, vec![0, 2, 4]);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(list.live(), 2);
    }

    #[test]
    fn test_push_while_locked_appends() {
        let mut list = SlotList::with_capacity(1);
        list.push(1);
        list.lock();
        list.push(2);
        assert_eq!(list.len(), 2);
        list.unlock();
        assert_eq!(list.len(), 2);
    }
}
