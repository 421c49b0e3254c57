//! Lookup of entries in HAMT sharded UnixFS directories.
pub mod bucket;
pub mod hash;
mod walker;

pub(crate) use walker::Located;
pub use walker::HamtShardWalker;
