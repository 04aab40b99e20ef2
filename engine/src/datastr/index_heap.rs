//! An updatable priority queue implemented with a 4-ary heap.
//!
//! Insertion and polling the minimal element have `O(log n)` time complexity.
//! Checking the minimal element is `O(1)`. Keys of queued values can
//! be decreased as well as increased in `O(log n)`, the heap keeps track of the position of each value.
//!
//! # Examples
//!
//! ```
//! use road_router::datastr::index_heap::IndexdMinHeap;
//!
//! let mut heap = IndexdMinHeap::new(3);
//! heap.insert(0u32, 42.0);
//! heap.insert(1u32, 23.0);
//! heap.insert(2u32, 50000.0);
//! assert_eq!(heap.peek_element(), Some(1));
//! heap.update(0, 1.0);
//! assert_eq!(heap.poll_element(), Some(0));
//! assert_eq!(heap.peek_key(), Some(23.0));
//! ```

use std::cmp::min;

/// A trait to map values in a heap to a unique index.
/// The value type of the `IndexdMinHeap` has to implement this trait.
pub trait Indexing {
    /// This method has to map a heap value to a unique `usize` index.
    fn as_index(&self) -> usize;
}

impl Indexing for u32 {
    fn as_index(&self) -> usize {
        *self as usize
    }
}

impl Indexing for usize {
    fn as_index(&self) -> usize {
        *self
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry<V, K> {
    value: V,
    key: K,
}

/// A min priority queue where the values are IDs from 0 to id_count-1 where id_count is the number passed to the constructor
/// or `ensure_capacity`.
/// Each value can be contained at most once, each with a key by which the heap is ordered.
///
/// Values with equal keys are polled in an order determined by the sequence of operations only,
/// so repeating the same operations always yields the same order.
#[derive(Debug, Clone)]
pub struct IndexdMinHeap<V, K> {
    positions: Vec<usize>,
    data: Vec<Entry<V, K>>,
}

const TREE_ARITY: usize = 4;
const INVALID_POSITION: usize = usize::MAX;

impl<V: Indexing + Copy, K: PartialOrd + Copy> IndexdMinHeap<V, K> {
    /// Creates an empty `IndexdMinHeap`.
    /// The indices (as defined by the `Indexing` trait) of all inserted values
    /// will have to be within `[0, max_id)`
    pub fn new(max_id: usize) -> IndexdMinHeap<V, K> {
        IndexdMinHeap {
            positions: vec![INVALID_POSITION; max_id],
            data: Vec::new(),
        }
    }

    /// Make room for values with indices up to `max_id` and for as many queued entries,
    /// so a search over a graph of known size never reallocates.
    pub fn ensure_capacity(&mut self, max_id: usize) {
        if self.positions.len() < max_id {
            self.positions.resize(max_id, INVALID_POSITION);
        }
        if self.data.capacity() < max_id {
            self.data.reserve(max_id - self.data.len());
        }
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if the heap already contains the given value
    pub fn contains(&self, value: V) -> bool {
        self.positions.get(value.as_index()).map_or(false, |&pos| pos != INVALID_POSITION)
    }

    /// The current key of a queued value.
    pub fn key_of(&self, value: V) -> Option<K> {
        if self.contains(value) {
            Some(self.data[self.positions[value.as_index()]].key)
        } else {
            None
        }
    }

    /// Drops all items from the heap.
    pub fn clear(&mut self) {
        for entry in &self.data {
            self.positions[entry.value.as_index()] = INVALID_POSITION;
        }
        self.data.clear();
    }

    pub fn peek(&self) -> Option<(V, K)> {
        self.data.first().map(|entry| (entry.value, entry.key))
    }

    pub fn peek_element(&self) -> Option<V> {
        self.data.first().map(|entry| entry.value)
    }

    pub fn peek_key(&self) -> Option<K> {
        self.data.first().map(|entry| entry.key)
    }

    /// Removes the value with the smallest key and returns it together with the key, or None if the heap is empty.
    pub fn pop(&mut self) -> Option<(V, K)> {
        if self.data.is_empty() {
            return None;
        }
        let last = self.data.len() - 1;
        self.swap_entries(0, last);
        let min = self.data.pop()?;
        self.positions[min.value.as_index()] = INVALID_POSITION;
        if !self.data.is_empty() {
            self.move_down_in_tree(0);
        }
        Some((min.value, min.key))
    }

    pub fn poll_element(&mut self) -> Option<V> {
        self.pop().map(|(value, _)| value)
    }

    /// Pushes a value onto the heap.
    /// Panics if the value is already queued, use `update` for that.
    pub fn insert(&mut self, value: V, key: K) {
        assert!(!self.contains(value), "value already queued");
        if value.as_index() >= self.positions.len() {
            self.ensure_capacity(value.as_index() + 1);
        }
        let insert_position = self.len();
        self.positions[value.as_index()] = insert_position;
        self.data.push(Entry { value, key });
        self.move_up_in_tree(insert_position);
    }

    /// Sets a new key for a queued value, smaller or larger than the old one.
    /// Panics if the value is not queued.
    pub fn update(&mut self, value: V, key: K) {
        assert!(self.contains(value), "value not queued");
        let position = self.positions[value.as_index()];
        let old = self.data[position].key;
        self.data[position].key = key;
        if key < old {
            self.move_up_in_tree(position);
        } else if old < key {
            self.move_down_in_tree(position);
        }
    }

    /// `insert` for new values, `update` for queued ones.
    pub fn insert_or_update(&mut self, value: V, key: K) {
        if self.contains(value) {
            self.update(value, key);
        } else {
            self.insert(value, key);
        }
    }

    fn swap_entries(&mut self, a: usize, b: usize) {
        self.positions.swap(self.data[a].value.as_index(), self.data[b].value.as_index());
        self.data.swap(a, b);
    }

    fn move_up_in_tree(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / TREE_ARITY;
            if !(self.data[position].key < self.data[parent].key) {
                break;
            }
            self.swap_entries(parent, position);
            position = parent;
        }
    }

    fn move_down_in_tree(&mut self, mut position: usize) {
        let heap_size = self.len();
        loop {
            let mut smallest_child: Option<usize> = None;
            for child in Self::children_index_range(position, heap_size) {
                match smallest_child {
                    Some(best) if !(self.data[child].key < self.data[best].key) => (),
                    _ => smallest_child = Some(child),
                }
            }

            match smallest_child {
                Some(child) if self.data[child].key < self.data[position].key => {
                    self.swap_entries(child, position);
                    position = child;
                }
                // no child is smaller
                _ => return,
            }
        }
    }

    fn children_index_range(parent_index: usize, heap_size: usize) -> std::ops::Range<usize> {
        let first_child = TREE_ARITY * parent_index + 1;
        let last_child = min(TREE_ARITY * parent_index + TREE_ARITY + 1, heap_size);
        first_child..last_child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn polls_in_key_order() {
        let mut heap = IndexdMinHeap::new(10);
        for (node, key) in [(3u32, 7.5), (1, 2.0), (7, 9.0), (2, 0.5), (9, 3.25)] {
            heap.insert(node, key);
        }
        let mut polled = Vec::new();
        while let Some((node, key)) = heap.pop() {
            polled.push((node, key));
        }
        assert_eq!(polled, vec![(2, 0.5), (1, 2.0), (9, 3.25), (3, 7.5), (7, 9.0)]);
    }

    #[test]
    fn increase_and_decrease() {
        let mut heap = IndexdMinHeap::new(4);
        heap.insert(0u32, 1);
        heap.insert(1u32, 2);
        heap.insert(2u32, 3);
        heap.update(0, 10);
        assert_eq!(heap.peek(), Some((1, 2)));
        heap.update(2, 0);
        assert_eq!(heap.peek(), Some((2, 0)));
        assert_eq!(heap.key_of(0), Some(10));
        assert_eq!(heap.key_of(3), None);
    }

    #[test]
    fn clear_resets_positions() {
        let mut heap = IndexdMinHeap::new(4);
        heap.insert(0u32, 1.0);
        heap.insert(3u32, 2.0);
        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(3));
        heap.insert(3, 5.0);
        assert_eq!(heap.poll_element(), Some(3));
    }

    #[test]
    fn grows_on_demand() {
        let mut heap = IndexdMinHeap::new(0);
        heap.ensure_capacity(5);
        heap.insert(4u32, 1.0);
        heap.insert(9u32, 0.0);
        assert_eq!(heap.size(), 2);
        assert_eq!(heap.poll_element(), Some(9));
    }

    #[test]
    #[should_panic]
    fn double_insert_panics() {
        let mut heap = IndexdMinHeap::new(2);
        heap.insert(1u32, 1.0);
        heap.insert(1u32, 2.0);
    }

    #[test]
    fn random_operations_match_naive_queue() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 64;
        let mut heap = IndexdMinHeap::new(n);
        let mut naive: Vec<Option<i64>> = vec![None; n];

        for _ in 0..5000 {
            let node = rng.gen_range(0..n);
            match rng.gen_range(0..3) {
                0 | 1 => {
                    let key = rng.gen_range(0..1000);
                    heap.insert_or_update(node, key);
                    naive[node] = Some(key);
                }
                _ => {
                    let size = heap.size();
                    let expected_min = naive.iter().filter_map(|&key| key).min();
                    match heap.pop() {
                        Some((value, key)) => {
                            assert_eq!(Some(key), expected_min);
                            assert_eq!(naive[value], Some(key));
                            assert_eq!(heap.size(), size - 1);
                            naive[value] = None;
                        }
                        None => assert_eq!(expected_min, None),
                    }
                }
            }
            assert_eq!(heap.size(), naive.iter().filter(|key| key.is_some()).count());
        }
    }
}
