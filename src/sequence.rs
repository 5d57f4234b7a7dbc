//! Small growable list used by constraint results and constraint contexts
//!
//! Growth policy:
//! - Nothing is allocated until the first insertion
//! - The first insertion reserves 8 slots
//! - Later growth multiplies capacity by 1.5, rounded up
//!
//! Only appends and front-range inserts are supported. There is no
//! removal from the middle.

use std::fmt;
use std::ops::{Deref, Index};

use serde::{Serialize, Serializer};

const INITIAL_CAPACITY: usize = 8;

/// Ordered growable list with a fixed growth policy.
#[derive(Clone, PartialEq)]
pub struct Sequence<T> {
    items: Vec<T>,
}

impl<T> Sequence<T> {
    /// The never-allocated empty sequence.
    pub const fn no_sequence() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates a sequence with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Appends an item at the end.
    pub fn push_back(&mut self, value: T) {
        self.reserve_item(1);
        self.items.push(value);
    }

    /// Inserts `values` at position 0, preserving their order.
    ///
    /// Existing items are shifted once regardless of how many are inserted.
    pub fn push_front_range<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        self.reserve_item(values.len());
        self.items.splice(0..0, values);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn reserve_item(&mut self, additional: usize) {
        let required = self.items.len() + additional;
        let mut capacity = self.items.capacity();
        if required <= capacity {
            return;
        }
        if capacity == 0 {
            capacity = INITIAL_CAPACITY;
        }
        while capacity < required {
            capacity += (capacity + 1) / 2;
        }
        self.items.reserve_exact(capacity - self.items.len());
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::no_sequence()
    }
}

impl<T> Deref for Sequence<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Index<usize> for Sequence<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut sequence = Self::no_sequence();
        for item in iter {
            sequence.push_back(item);
        }
        sequence
    }
}

impl<T> IntoIterator for Sequence<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'s, T> IntoIterator for &'s Sequence<T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Serialize> Serialize for Sequence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sequence_never_allocates() {
        let sequence: Sequence<u32> = Sequence::no_sequence();
        assert_eq!(sequence.capacity(), 0);
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_growth_policy() {
        let mut sequence = Sequence::no_sequence();
        sequence.push_back(1);
        assert_eq!(sequence.capacity(), 8);

        for i in 2..=9 {
            sequence.push_back(i);
        }
        // 8 + ceil(8 / 2)
        assert_eq!(sequence.capacity(), 12);
        assert_eq!(sequence.len(), 9);
    }

    #[test]
    fn test_push_front_range_keeps_order() {
        let mut sequence: Sequence<&str> = ["c", "d"].into_iter().collect();
        sequence.push_front_range(["a", "b"]);
        assert_eq!(sequence.as_slice(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn test_index_and_iteration() {
        let sequence: Sequence<i32> = (0..5).collect();
        assert_eq!(sequence[3], 3);
        assert_eq!(sequence.iter().sum::<i32>(), 10);
    }
}
