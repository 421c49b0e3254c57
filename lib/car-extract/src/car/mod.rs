//! Reading and writing of CAR archives, and a blockstore serving blocks out of one.
//!
//! A CAR is a dag-cbor header naming the root CIDs, followed by blocks framed as
//! `varint(len) ‖ cid ‖ data`. CARv2 wraps such an archive behind a fixed pragma and a 40 byte
//! header pointing at the data section.
mod blockstore;
mod reader;
mod writer;

use cid::Cid;
use serde::{Deserialize, Serialize};

pub use blockstore::CarBlockstore;
pub use reader::CarReader;
pub use writer::CarWriter;

/// Upper bound for a single header, frame or CARv2 padding.
pub const MAX_ALLOC: usize = 4 * 1024 * 1024;

/// Header of a CARv1 archive, or of the archive wrapped in a CARv2 file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CarHeader {
    pub roots: Vec<Cid>,
    pub version: u64,
}

impl CarHeader {
    pub fn new(roots: Vec<Cid>) -> Self {
        Self { roots, version: 1 }
    }
}

/// The fixed header following the pragma of a CARv2 file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarV2Header {
    pub characteristics: u128,
    pub data_offset: u64,
    pub data_size: u64,
    pub index_offset: u64,
}

impl CarV2Header {
    pub const SIZE: usize = 40;

    fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        let word = |at: usize| {
            let mut bytes = [0; 8];
            bytes.copy_from_slice(&buf[at..at + 8]);
            u64::from_le_bytes(bytes)
        };
        let mut characteristics = [0; 16];
        characteristics.copy_from_slice(&buf[..16]);
        Self {
            characteristics: u128::from_be_bytes(characteristics),
            data_offset: word(16),
            data_size: word(24),
            index_offset: word(32),
        }
    }
}
