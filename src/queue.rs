//! In-memory index of pending occurrences. The queue is a cache rebuilt
//! from the repository at any time, never the source of truth.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::reminder::Occurrence;

/// Min-heap that only contains unique occurrences.
///
/// The membership set mirrors the heap on every add and pop, so an instant
/// is queued at most once no matter how many reminders share it.
pub(crate) struct UniqueHeapQueue {
    heap: BinaryHeap<Reverse<Occurrence>>,
    in_heap: HashSet<Occurrence>,
}

impl UniqueHeapQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            in_heap: HashSet::new(),
        }
    }

    /// Add many occurrences at once; duplicates are silently ignored.
    pub(crate) fn add(&mut self, occurrences: Vec<Occurrence>) {
        let new_occurrences: Vec<_> = occurrences
            .into_iter()
            .filter(|occurrence| self.in_heap.insert(*occurrence))
            .map(Reverse)
            .collect();
        self.heap.extend(new_occurrences);
    }

    /// Every queued occurrence in ascending order, non-destructively.
    #[allow(dead_code)]
    pub(crate) fn peek_all(&self) -> Vec<Occurrence> {
        let mut occurrences: Vec<_> = self
            .heap
            .iter()
            .map(|&Reverse(occurrence)| occurrence)
            .collect();
        occurrences.sort_unstable();
        occurrences
    }

    /// Remove and return, in ascending order, every occurrence strictly
    /// before `until`. The first occurrence at or past `until` stays queued.
    pub(crate) fn pop_occurrences(
        &mut self,
        until: Occurrence,
    ) -> Vec<Occurrence> {
        let mut popped = Vec::new();
        while let Some(Reverse(occurrence)) = self.heap.pop() {
            if occurrence >= until {
                self.heap.push(Reverse(occurrence));
                break;
            }
            self.in_heap.remove(&occurrence);
            popped.push(occurrence);
        }
        popped
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test::d;

    #[test]
    fn test_add_ignores_duplicates() {
        let mut queue = UniqueHeapQueue::new();
        let occurrence = d(2023, 7, 5, 0, 0, 1);
        queue.add(vec![occurrence, occurrence]);
        queue.add(vec![occurrence]);
        assert_eq!(queue.peek_all(), vec![occurrence]);
    }

    #[test]
    fn test_peek_all_is_ascending_and_non_destructive() {
        let mut queue = UniqueHeapQueue::new();
        let a = d(2023, 7, 5, 0, 0, 1);
        let b = d(2023, 7, 5, 0, 0, 13);
        let c = d(2023, 7, 6, 0, 0, 0);
        queue.add(vec![c, a, b]);
        assert_eq!(queue.peek_all(), vec![a, b, c]);
        assert_eq!(queue.peek_all(), vec![a, b, c]);
    }

    #[test]
    fn test_pop_occurrences_returns_the_strict_prefix() {
        let mut queue = UniqueHeapQueue::new();
        let a = d(2023, 7, 5, 0, 0, 1);
        let b = d(2023, 7, 5, 0, 0, 13);
        let c = d(2023, 7, 6, 0, 0, 0);
        queue.add(vec![b, c, a]);

        let popped = queue.pop_occurrences(d(2023, 7, 5, 0, 1, 0));
        assert_eq!(popped, vec![a, b]);
        assert_eq!(queue.peek_all(), vec![c]);
    }

    #[test]
    fn test_pop_occurrences_excludes_the_boundary() {
        let mut queue = UniqueHeapQueue::new();
        let at = d(2023, 7, 5, 0, 0, 1);
        queue.add(vec![at]);

        assert_eq!(queue.pop_occurrences(at), Vec::<Occurrence>::new());
        assert_eq!(queue.peek_all(), vec![at]);
    }

    #[test]
    fn test_pop_occurrences_on_an_empty_queue() {
        let mut queue = UniqueHeapQueue::new();
        assert_eq!(
            queue.pop_occurrences(d(2023, 7, 5, 0, 0, 1)),
            Vec::<Occurrence>::new()
        );
    }

    #[test]
    fn test_popped_occurrences_can_be_added_again() {
        let mut queue = UniqueHeapQueue::new();
        let at = d(2023, 7, 5, 0, 0, 1);
        queue.add(vec![at]);
        queue.pop_occurrences(d(2023, 7, 6, 0, 0, 0));
        queue.add(vec![at]);
        assert_eq!(queue.peek_all(), vec![at]);
    }
}
