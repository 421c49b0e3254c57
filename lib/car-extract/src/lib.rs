//! Path resolution and sub-graph export over content-addressed block graphs.
//!
//! Given a path like `<root-cid>/dir/file.txt`, [`Extractor::resolve`] yields every block needed
//! to verify that path, in traversal order, followed by the complete sub-graph of the block the
//! path names. Plain UnixFS directories, HAMT sharded directories and DAG-CBOR documents are
//! supported.
pub mod block;
pub mod blockstore;
pub mod car;
pub mod config;
pub mod content;
pub mod decoder;
pub mod errors;
pub mod exporter;
pub mod extractor;
pub mod hamt;
pub mod resolver;
pub mod unixfs;

pub use block::Block;
pub use blockstore::{Blockstore, MemoryBlockstore};
pub use config::ExtractConfig;
pub use errors::ExtractError;
pub use extractor::Extractor;
pub use resolver::LogicalPath;
