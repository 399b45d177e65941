use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

/// Hash-consing table with chained buckets.
///
/// Index `0` is a sentry and never holds a value, so `0` doubles as the end-of-chain marker.
/// Entries are never removed. When the number of entries exceeds twice the number of buckets,
/// the bucket array is doubled and every chain is relinked.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Copy,
{
    /// Create a new table with room for `2^bits` values, using `sentry` to fill cell `0`.
    pub fn new(bits: usize, sentry: T) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let mut data = Vec::with_capacity(1 << bits);
        data.push(Entry { value: sentry, next: 0 });

        let buckets_size = 1 << min(bits, 16);
        Self {
            data,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Number of stored values, excluding the sentry.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Append a value without hash-consing it.
    pub fn add(&mut self, value: T) -> usize {
        self.data.push(Entry { value, next: 0 });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Return the index of `value`, inserting it if it is not stored yet.
    pub fn put(&mut self, value: T) -> usize {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket];
        while index != 0 {
            if self.data[index].value == value {
                return index;
            }
            index = self.data[index].next;
        }

        let i = self.add(value);
        self.data[i].next = self.buckets[bucket];
        self.buckets[bucket] = i;

        if self.size() > 2 * self.buckets.len() {
            self.grow();
        }
        i
    }

    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        log::debug!("Growing unique table to {} buckets", size);
        self.buckets = vec![0; size];
        self.bitmask = (size - 1) as u64;
        for i in 1..self.data.len() {
            let bucket = self.bucket_index(&self.data[i].value);
            self.data[i].next = self.buckets[bucket];
            self.buckets[bucket] = i;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2, 0);
        let index = table.add(42);
        assert_eq!(index, 1);
        assert_eq!(table[index], 42);
        assert_eq!(table.next(index), 0);
    }

    #[test]
    fn test_put_shares_equal_values() {
        let mut table = Table::new(2, Item(0));
        let a = table.put(Item(5));
        let b = table.put(Item(-5));
        assert_ne!(a, b);
        assert_eq!(table.put(Item(5)), a);
        assert_eq!(table.put(Item(-5)), b);
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn test_put_grows_buckets() {
        let mut table = Table::new(1, Item(0));
        let indices: Vec<_> = (1..=40).map(|i| table.put(Item(i))).collect();
        assert!(table.num_buckets() > 2);
        for (i, &index) in (1..=40).zip(indices.iter()) {
            assert_eq!(table.put(Item(i)), index);
            assert_eq!(table[index], Item(i));
        }
    }
}
