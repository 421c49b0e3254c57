use bytes::Bytes;
use cid::Cid;

/// Multicodec tag of raw leaf blocks.
pub const RAW_CODEC: u64 = 0x55;
/// Multicodec tag of DAG-PB blocks.
pub const DAG_PB_CODEC: u64 = 0x70;
/// Multicodec tag of DAG-CBOR blocks.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// An immutable unit of storage: a content identifier plus the bytes it names.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("cid", &self.cid.to_string())
            .field("data-length", &self.data.len())
            .finish()
    }
}

impl Block {
    pub fn new(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn codec(&self) -> u64 {
        self.cid.codec()
    }

    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }
}
