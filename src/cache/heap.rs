//! Frequency Heap Module
//!
//! Indexed binary min-heap ordered by access frequency, used by the LFU
//! wrapper.
//!
//! Every key gets a stable [`HeapHandle`] on insertion. The handle maps to
//! the key's current heap position, so a frequency bump or a removal
//! restores ordering in O(log n) instead of rebuilding the heap.
//!
//! Ordering is by `(frequency, insertion sequence)`: among keys with the same
//! frequency, the one inserted first sits closer to the root and is evicted
//! first.

// == Heap Handle ==
/// Stable reference to a key's slot in a [`FrequencyHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(usize);

#[derive(Debug)]
struct Slot<K> {
    key: K,
    frequency: u64,
    sequence: u64,
    position: usize,
}

// == Frequency Heap ==
#[derive(Debug)]
pub struct FrequencyHeap<K> {
    /// Slot indices in heap order; `order[0]` is the minimum
    order: Vec<usize>,
    slots: Vec<Option<Slot<K>>>,
    free: Vec<usize>,
    next_sequence: u64,
}

impl<K> Default for FrequencyHeap<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<K> FrequencyHeap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Push ==
    /// Inserts a key with frequency zero. O(log n).
    pub fn push(&mut self, key: K) -> HeapHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let slot = Slot {
            key,
            frequency: 0,
            sequence,
            position: self.order.len(),
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        self.order.push(index);
        self.sift_up(self.order.len() - 1);
        HeapHandle(index)
    }

    // == Increment ==
    /// Adds one to a key's frequency and returns the new value. O(log n).
    pub fn increment(&mut self, handle: HeapHandle) -> Option<u64> {
        let slot = self.slots.get_mut(handle.0)?.as_mut()?;
        slot.frequency += 1;
        let (frequency, position) = (slot.frequency, slot.position);

        // A larger key in a min-heap can only move down.
        self.sift_down(position);
        Some(frequency)
    }

    // == Remove ==
    /// Removes a key by handle, returning it with its frequency. O(log n).
    pub fn remove(&mut self, handle: HeapHandle) -> Option<(K, u64)> {
        let position = self.slots.get(handle.0)?.as_ref()?.position;
        let last = self.order.len() - 1;

        self.swap(position, last);
        self.order.pop();
        if position < self.order.len() {
            self.sift_down(position);
            self.sift_up(position);
        }

        let slot = self.slots[handle.0].take()?;
        self.free.push(handle.0);
        Some((slot.key, slot.frequency))
    }

    /// Removes and returns the least frequently used key.
    #[cfg(test)]
    pub(crate) fn pop_min(&mut self) -> Option<(K, u64)> {
        let root = *self.order.first()?;
        self.remove(HeapHandle(root))
    }

    // == Peek ==
    /// Returns the least frequently used key. O(1).
    pub fn peek_min(&self) -> Option<&K> {
        self.order
            .first()
            .and_then(|&index| self.slots[index].as_ref())
            .map(|slot| &slot.key)
    }

    pub fn peek_min_handle(&self) -> Option<HeapHandle> {
        self.order.first().copied().map(HeapHandle)
    }

    pub fn get(&self, handle: HeapHandle) -> Option<&K> {
        self.slot(handle).map(|slot| &slot.key)
    }

    pub fn frequency(&self, handle: HeapHandle) -> Option<u64> {
        self.slot(handle).map(|slot| slot.frequency)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.slots.clear();
        self.free.clear();
    }

    /// Iterates keys in heap order (not sorted).
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order
            .iter()
            .filter_map(|&index| self.slots[index].as_ref())
            .map(|slot| &slot.key)
    }

    // == Ordering ==
    fn slot(&self, handle: HeapHandle) -> Option<&Slot<K>> {
        self.slots.get(handle.0).and_then(|slot| slot.as_ref())
    }

    fn rank(&self, position: usize) -> (u64, u64) {
        match &self.slots[self.order[position]] {
            Some(slot) => (slot.frequency, slot.sequence),
            None => (u64::MAX, u64::MAX),
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.rank(a) < self.rank(b)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        for position in [a, b] {
            if let Some(slot) = self.slots[self.order[position]].as_mut() {
                slot.position = position;
            }
        }
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.less(position, parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        let len = self.order.len();
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut smallest = position;

            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == position {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }
}
