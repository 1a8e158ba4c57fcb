use std::collections::BTreeMap;

/// Holds out-of-order completions until every earlier sequence index has been released
pub(crate) struct OrdQueue<T> {
    next: usize,
    pending: BTreeMap<usize, T>,
}

impl<T> OrdQueue<T> {
    pub fn new() -> OrdQueue<T> {
        OrdQueue {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, index: usize, item: T) {
        debug_assert!(index >= self.next, "index {} released twice", index);
        self.pending.insert(index, item);
    }

    /// The item with the next sequence index, if it has arrived
    pub fn pop(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Number of items released so far
    pub fn released(&self) -> usize {
        self.next
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
