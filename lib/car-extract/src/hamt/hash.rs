//! Hashing of HAMT entry names.
//!
//! Shards are keyed by the first 8 bytes of the murmur3 x64 128 digest (its `h1` half, written big
//! endian), with those bytes reversed. The key is therefore `h1` in little endian order, and bits
//! are read starting from its last byte.
use std::io;

/// Number of bytes of the digest kept as routing key.
pub const HASH_BYTES: usize = 8;

/// Compute the 64 bit routing key of `value`.
pub fn hash_key(value: &[u8]) -> io::Result<[u8; HASH_BYTES]> {
    let digest = murmur3::murmur3_x64_128(&mut &value[..], 0)?;
    let mut key = [0; HASH_BYTES];
    // `h1` sits in the low half of the digest.
    key.copy_from_slice(&digest.to_le_bytes()[..HASH_BYTES]);
    Ok(key)
}

/// A bit stream over the hash of a key that never runs dry.
///
/// Bytes are consumed from the last byte of a key to the first, each most significant bit first.
/// In other words the bits of `h1` are read from its most significant end. Once the 64 bits of a
/// digest are exhausted, another digest is produced by hashing the key followed by the number of
/// digests produced so far.
#[derive(Clone, Debug)]
pub struct InfiniteHash {
    value: Vec<u8>,
    digests: Vec<[u8; HASH_BYTES]>,
    consumed: usize,
}

impl InfiniteHash {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            digests: Vec::new(),
            consumed: 0,
        }
    }

    fn available_bits(&self) -> usize {
        self.digests.len() * HASH_BYTES * 8 - self.consumed
    }

    fn produce_more_bits(&mut self) -> io::Result<()> {
        let depth = self.digests.len();
        let digest = if depth == 0 {
            hash_key(&self.value)?
        } else {
            let mut value = self.value.clone();
            value.push(depth as u8);
            hash_key(&value)?
        };
        self.digests.push(digest);
        Ok(())
    }

    /// Take the next `bits` bits as an integer.
    pub fn take(&mut self, bits: u32) -> io::Result<usize> {
        while self.available_bits() < bits as usize {
            self.produce_more_bits()?;
        }
        let mut result = 0;
        for _ in 0..bits {
            let byte = self.consumed / 8;
            let digest = &self.digests[byte / HASH_BYTES];
            let index = HASH_BYTES - 1 - byte % HASH_BYTES;
            let bit = (digest[index] >> (7 - self.consumed % 8)) & 1;
            result = (result << 1) | bit as usize;
            self.consumed += 1;
        }
        Ok(result)
    }
}
