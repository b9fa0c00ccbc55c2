use std::convert::TryFrom;
use std::mem;
use std::num::NonZeroU32;
use std::ops::{Index, IndexMut};

/// A 32-bit handle into a [`SlotStore`].
///
/// Handles are never zero, so `Option<Handle>` is the same size as the raw
/// index and `None` serves as the chain/list terminator wherever a sentinel
/// is needed.
///
/// [`SlotStore`]: struct.SlotStore.html
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Handle(NonZeroU32);

impl Handle {
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1).expect("slot store exceeded the u32 handle space");
        Self(NonZeroU32::new(raw).expect("slot handles start at one"))
    }

    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The raw handle value; the first slot allocated by a store is `1`.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

enum Slot<T> {
    Occupied(T),
    Vacant(Option<Handle>),
}

/// A growable store which recycles fixed-size slots behind [`Handle`]s.
///
/// Freed slots are threaded into a chain through their own storage: a vacant
/// slot holds the handle of the next vacant slot. [`insert`] pops that chain
/// in O(1) when it is non-empty and appends to the backing vector otherwise,
/// so handles are assigned in allocation order until the first [`remove`].
///
/// A handle stays valid until it is passed to [`remove`]; indexing with it
/// afterwards panics. Handles obtained from one store must not be used with
/// another.
///
/// [`Handle`]: struct.Handle.html
/// [`insert`]: struct.SlotStore.html#method.insert
/// [`remove`]: struct.SlotStore.html#method.remove
pub struct SlotStore<T> {
    slots: Vec<Slot<T>>,
    free: Option<Handle>,
    len: usize,
}

impl<T> SlotStore<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: None,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: None,
            len: 0,
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Store `value`, reusing the most recently freed slot if one exists.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(handle) = self.free {
            self.free = match self.slots[handle.index()] {
                Slot::Vacant(next) => next,
                Slot::Occupied(_) => unreachable!("free chain entered an occupied slot"),
            };
            self.slots[handle.index()] = Slot::Occupied(value);
            handle
        } else {
            let handle = Handle::from_index(self.slots.len());
            self.slots.push(Slot::Occupied(value));
            handle
        }
    }

    /// Free the slot behind `handle` and return its payload.
    ///
    /// Panics if `handle` is not currently allocated from this store.
    pub fn remove(&mut self, handle: Handle) -> T {
        if let Slot::Vacant(_) = self.slots[handle.index()] {
            panic!("handle {:?} is not currently allocated", handle);
        }
        match mem::replace(&mut self.slots[handle.index()], Slot::Vacant(self.free)) {
            Slot::Occupied(value) => {
                self.free = Some(handle);
                self.len -= 1;
                value
            }
            Slot::Vacant(_) => unreachable!(),
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.index()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// An empty store sized for rebuilding this one's live contents.
    ///
    /// Capacity is the smaller of the current capacity and twice the current
    /// occupancy, which sheds the slack left behind by freed slots instead of
    /// carrying it into the next generation.
    pub fn for_rebuild(&self) -> Self {
        Self {
            slots: Vec::with_capacity(std::cmp::min(self.slots.capacity(), 2 * self.len)),
            free: None,
            len: 0,
        }
    }

    /// Iterate over occupied slots in handle order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(value) => Some((Handle::from_index(index), value)),
                Slot::Vacant(_) => None,
            })
    }
}

impl<T> Default for SlotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Handle> for SlotStore<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        match &self.slots[handle.index()] {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => panic!("handle {:?} is not currently allocated", handle),
        }
    }
}

impl<T> IndexMut<Handle> for SlotStore<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        match &mut self.slots[handle.index()] {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => panic!("handle {:?} is not currently allocated", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn handles_are_assigned_in_allocation_order() {
        let mut store = SlotStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        let c = store.insert("c");
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(c.get(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store[b], "b");
    }

    #[test]
    fn freed_slot_is_reused_before_fresh_storage() {
        let mut store = SlotStore::new();
        let _a = store.insert(0u32);
        let b = store.insert(1u32);
        let _c = store.insert(2u32);
        assert_eq!(store.remove(b), 1);
        assert_eq!(store.insert(3u32), b);
        assert_eq!(store[b], 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn free_chain_pops_in_lifo_order() {
        let mut store = SlotStore::new();
        let handles: Vec<_> = (0..4).map(|value| store.insert(value)).collect();
        store.remove(handles[1]);
        store.remove(handles[3]);
        assert_eq!(store.insert(10), handles[3]);
        assert_eq!(store.insert(11), handles[1]);
        assert_eq!(store.insert(12).get(), 5);
    }

    #[test]
    #[should_panic(expected = "not currently allocated")]
    fn double_remove_panics() {
        let mut store = SlotStore::new();
        let a = store.insert(7u32);
        store.remove(a);
        store.remove(a);
    }

    #[test]
    fn rebuild_store_sheds_freed_capacity() {
        let mut store = SlotStore::new();
        let handles: Vec<_> = (0..64).map(|value| store.insert(value)).collect();
        for &handle in &handles[4..] {
            store.remove(handle);
        }
        let fresh: SlotStore<i32> = store.for_rebuild();
        assert!(fresh.is_empty());
        assert!(fresh.capacity() >= 2 * store.len());
        assert!(fresh.capacity() <= store.capacity());
    }

    #[test]
    fn iter_skips_vacant_slots() {
        let mut store = SlotStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        let c = store.insert("c");
        store.remove(b);
        let live: Vec<_> = store.iter().collect();
        assert_eq!(live, vec![(a, &"a"), (c, &"c")]);
    }

    #[test]
    fn randomized_churn_matches_mirror() {
        let mut prng = rand_chacha::ChaChaRng::seed_from_u64(0);
        let mut store = SlotStore::new();
        let mut live: Vec<(Handle, u64)> = Vec::new();
        for round in 0..10000u64 {
            if live.is_empty() || prng.gen_bool(0.6) {
                live.push((store.insert(round), round));
            } else {
                let picked = prng.gen_range(0, live.len());
                let (handle, value) = live.swap_remove(picked);
                assert_eq!(store.remove(handle), value);
            }
            assert_eq!(store.len(), live.len());
        }
        for &(handle, value) in &live {
            assert_eq!(store[handle], value);
        }
    }
}
