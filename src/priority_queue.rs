//! Min-priority queue for watershed flooding
//!
//! Items are ordered by elevation (lowest first). Equal elevations pop in
//! insertion order, tracked with a monotonically increasing age, so a flood
//! driven by this queue is fully deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry<T> {
    elevation: f64,
    age: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // BinaryHeap is a max-heap: reverse so the lowest (elevation, age) is on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then_with(|| other.age.cmp(&self.age))
    }
}

pub struct FloodQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_age: u64,
}

impl<T> FloodQueue<T> {
    pub fn new() -> Self {
        FloodQueue {
            heap: BinaryHeap::new(),
            next_age: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FloodQueue {
            heap: BinaryHeap::with_capacity(capacity),
            next_age: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn push(&mut self, elevation: f64, item: T) {
        let age = self.next_age;
        self.next_age += 1;
        self.heap.push(Entry { elevation, age, item });
    }

    /// Pop the lowest-elevation item, oldest first among ties
    #[inline]
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|e| (e.elevation, e.item))
    }
}

impl<T> Default for FloodQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
