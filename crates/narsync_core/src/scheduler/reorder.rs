//! Slot array that releases out-of-order completions in index order.

/// Buffers items keyed by index and releases the contiguous ready prefix.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    slots: Vec<Option<T>>,
    next: usize,
}

impl<T> ReorderBuffer<T> {
    /// Buffer for indices `0..len`.
    pub fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
            next: 0,
        }
    }

    /// Place an item in its slot.
    ///
    /// Returns `false` (and drops the item) if the index is out of range,
    /// already released, or already filled.
    pub fn insert(&mut self, index: usize, item: T) -> bool {
        if index < self.next {
            return false;
        }
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(item);
                true
            }
            _ => false,
        }
    }

    /// Release every item from the next expected index up to the first gap.
    pub fn drain_ready(&mut self) -> Vec<T> {
        let mut ready = Vec::new();
        while let Some(item) = self.slots.get_mut(self.next).and_then(Option::take) {
            ready.push(item);
            self.next += 1;
        }
        ready
    }

    /// Index of the next item to be released.
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Whether every index has been released.
    pub fn is_complete(&self) -> bool {
        self.next == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_only_contiguous_prefix() {
        let mut buf = ReorderBuffer::new(4);
        assert!(buf.insert(2, "c"));
        assert!(buf.insert(1, "b"));
        assert!(buf.drain_ready().is_empty());

        assert!(buf.insert(0, "a"));
        assert_eq!(buf.drain_ready(), vec!["a", "b", "c"]);
        assert_eq!(buf.next_index(), 3);
        assert!(!buf.is_complete());

        assert!(buf.insert(3, "d"));
        assert_eq!(buf.drain_ready(), vec!["d"]);
        assert!(buf.is_complete());
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        let mut buf = ReorderBuffer::new(2);
        assert!(buf.insert(1, 10));
        assert!(!buf.insert(1, 11));
        assert!(!buf.insert(5, 0));
        assert!(buf.insert(0, 9));
        assert_eq!(buf.drain_ready(), vec![9, 10]);
        // Already released
        assert!(!buf.insert(0, 1));
    }

    #[test]
    fn every_permutation_releases_in_order() {
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let mut buf = ReorderBuffer::new(3);
            let mut released = Vec::new();
            for i in order {
                buf.insert(i, i);
                released.extend(buf.drain_ready());
            }
            assert_eq!(released, vec![0, 1, 2], "order {:?}", order);
        }
    }
}
