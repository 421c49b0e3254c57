//! The in-memory bucket trie the shard walker projects shard nodes into.
//!
//! Buckets live in a flat arena and refer to their parent by index, so the trie has no ownership
//! cycles and is dropped as a whole when the walk that built it finishes.
use std::collections::BTreeMap;
use std::io;

use super::hash::InfiniteHash;

pub type BucketId = usize;

/// Index of the root bucket in every trie.
pub const ROOT: BucketId = 0;

#[derive(Debug)]
struct Entry {
    key: String,
    hash: InfiniteHash,
}

#[derive(Debug)]
enum Slot {
    Bucket(BucketId),
    Entry(Entry),
}

#[derive(Debug)]
struct Bucket {
    parent: Option<BucketId>,
    pos_at_parent: usize,
    slots: BTreeMap<usize, Slot>,
}

/// A bucket and a slot within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub bucket: BucketId,
    pub pos: usize,
}

#[derive(Debug)]
pub struct BucketTrie {
    bits: u32,
    buckets: Vec<Bucket>,
}

impl BucketTrie {
    /// Create a trie with `2^bits` slots per bucket.
    pub fn new(bits: u32) -> Self {
        Self {
            bits,
            buckets: vec![Bucket {
                parent: None,
                pos_at_parent: 0,
                slots: BTreeMap::new(),
            }],
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn table_size(&self) -> usize {
        1 << self.bits
    }

    /// Place a new, empty bucket at `pos` of `parent`, replacing whatever occupied the slot.
    pub fn put_bucket_at(&mut self, parent: BucketId, pos: usize) -> BucketId {
        let id = self.buckets.len();
        self.buckets.push(Bucket {
            parent: Some(parent),
            pos_at_parent: pos,
            slots: BTreeMap::new(),
        });
        self.buckets[parent].slots.insert(pos, Slot::Bucket(id));
        id
    }

    /// Insert a literal entry, splitting buckets on collisions.
    pub fn put(&mut self, key: &str) -> io::Result<()> {
        let (position, hash) = self.find_new_bucket_and_pos(key)?;
        self.put_entry(
            position,
            Entry {
                key: key.to_string(),
                hash,
            },
        );
        Ok(())
    }

    /// Find where `key` belongs, descending through known buckets.
    ///
    /// When the slot is taken by a different entry, a new bucket replaces it, the previous entry
    /// moves one level down and the search continues from there. The returned hash is positioned
    /// right after the bits consumed to reach the slot.
    pub fn find_new_bucket_and_pos(&mut self, key: &str) -> io::Result<(Position, InfiniteHash)> {
        let mut hash = InfiniteHash::new(key);
        let mut start = ROOT;
        loop {
            let place = self.find_place(start, &mut hash)?;
            let conflict = matches!(
                self.buckets[place.bucket].slots.get(&place.pos),
                Some(Slot::Entry(existing)) if existing.key != key
            );
            if !conflict {
                return Ok((place, hash));
            }

            let Some(Slot::Entry(mut existing)) =
                self.buckets[place.bucket].slots.remove(&place.pos)
            else {
                unreachable!("slot was checked to hold an entry");
            };
            let child = self.put_bucket_at(place.bucket, place.pos);
            let moved = self.find_place(child, &mut existing.hash)?;
            self.put_entry(moved, existing);
            start = child;
        }
    }

    fn find_place(&self, start: BucketId, hash: &mut InfiniteHash) -> io::Result<Position> {
        let mut bucket = start;
        loop {
            let pos = hash.take(self.bits)?;
            match self.buckets[bucket].slots.get(&pos) {
                Some(Slot::Bucket(child)) => bucket = *child,
                _ => return Ok(Position { bucket, pos }),
            }
        }
    }

    fn put_entry(&mut self, position: Position, entry: Entry) {
        self.buckets[position.bucket]
            .slots
            .insert(position.pos, Slot::Entry(entry));
    }

    /// Buckets from the root down to `bucket`, both included.
    pub fn bucket_path(&self, bucket: BucketId) -> Vec<BucketId> {
        let mut path = vec![bucket];
        let mut current = bucket;
        while let Some(parent) = self.buckets[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn pos_at_parent(&self, bucket: BucketId) -> usize {
        self.buckets[bucket].pos_at_parent
    }

    /// The key of the entry stored at `position`, if the slot holds one.
    pub fn entry_at(&self, position: Position) -> Option<&str> {
        match self.buckets[position.bucket].slots.get(&position.pos) {
            Some(Slot::Entry(entry)) => Some(&entry.key),
            _ => None,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
