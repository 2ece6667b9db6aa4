//! Chained hash index over pool-allocated records
//!
//! A [`Dict`] maps a key to the slot of a record that lives in some
//! caller-owned [`Arena`](crate::arena::Arena).  The bucket count is fixed
//! at creation and chains are unbounded; at the scale this crate operates
//! (tens to low hundreds of vertices per joint) correctness matters more
//! than lookup speed.
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::arena::Arena;
use crate::Error;

#[derive(Clone, Debug, Default)]
struct Entry<K> {
    key: K,
    record: usize,
    next: Option<usize>,
}

/// Hash index from `K` to a record slot in a caller-owned pool
#[derive(Clone, Debug)]
pub struct Dict<K> {
    /// Head entry slot per bucket
    buckets: Arena<Option<usize>>,
    entries: Arena<Entry<K>>,
}

impl<K: Hash + Eq + Default> Dict<K> {
    pub fn new(bucket_count: usize) -> Result<Self, Error> {
        assert!(bucket_count > 0);
        let mut buckets = Arena::new();
        buckets.set_len(bucket_count)?;
        Ok(Self {
            buckets,
            entries: Arena::new(),
        })
    }

    fn bucket(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.buckets.len() as u64) as usize
    }

    /// Looks up the record slot stored under `key`
    pub fn find(&self, key: &K) -> Option<usize> {
        let mut cursor = self.buckets[self.bucket(key)];
        while let Some(slot) = cursor {
            let entry = &self.entries[slot];
            if entry.key == *key {
                return Some(entry.record);
            }
            cursor = entry.next;
        }
        None
    }

    /// Returns the record slot under `key`, calling `make` to allocate the
    /// record if the key is new
    pub fn get_or_insert_with(
        &mut self,
        key: K,
        make: impl FnOnce() -> Result<usize, Error>,
    ) -> Result<usize, Error> {
        if let Some(record) = self.find(&key) {
            return Ok(record);
        }
        let record = make()?;
        let bucket = self.bucket(&key);
        let entry = self.entries.push(Entry {
            key,
            record,
            next: self.buckets[bucket],
        })?;
        self.buckets[bucket] = Some(entry);
        Ok(record)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn find_and_insert() {
        let mut dict: Dict<(usize, usize)> = Dict::new(64).unwrap();
        assert_eq!(dict.find(&(1, 2)), None);

        let r = dict.get_or_insert_with((1, 2), || Ok(10)).unwrap();
        assert_eq!(r, 10);
        // second lookup must not call the allocator again
        let r = dict
            .get_or_insert_with((1, 2), || panic!("duplicate insert"))
            .unwrap();
        assert_eq!(r, 10);
        assert_eq!(dict.find(&(1, 2)), Some(10));
    }

    #[test]
    fn single_bucket_chains() {
        // every key collides; the chain must still resolve all of them
        let mut dict: Dict<u64> = Dict::new(1).unwrap();
        for i in 0..100u64 {
            dict.get_or_insert_with(i, || Ok(i as usize * 2)).unwrap();
        }
        for i in 0..100u64 {
            assert_eq!(dict.find(&i), Some(i as usize * 2));
        }
        assert_eq!(dict.find(&100), None);
    }

    #[test]
    fn canonical_triples_collide() {
        // face keys are sorted before lookup, so permutations of the same
        // triangle land on one record
        let mut dict: Dict<[usize; 3]> = Dict::new(16).unwrap();
        let mut key = [9, 2, 5];
        key.sort_unstable();
        dict.get_or_insert_with(key, || Ok(0)).unwrap();

        let mut other = [5, 9, 2];
        other.sort_unstable();
        assert_eq!(dict.find(&other), Some(0));
    }
}
