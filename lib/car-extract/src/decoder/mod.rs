//! This module provides the decoder registry that turns raw blocks into [`Node`]s.
//!
//! Decoding is keyed by the multicodec tag carried in the block's CID. The registry is an explicit
//! value built once by the caller and passed by reference to the resolver and the exporter, so
//! different callers may support different codec sets.
pub mod dag_cbor;
pub mod dag_pb;
pub mod node;
pub mod raw;

use std::collections::HashMap;

pub use node::{DirectoryNode, Link, Marker, Node, ShardParams};

use crate::block::Block;
use crate::errors::ExtractError;

/// Trait to decode the bytes of a block with a given codec into a [`Node`].
pub trait NodeDecoder: Send + Sync {
    /// The multicodec tag this decoder handles.
    fn codec(&self) -> u64;

    fn decode(&self, block: &Block) -> Result<Node, ExtractError>;
}

pub struct DecoderRegistry {
    decoders: HashMap<u64, Box<dyn NodeDecoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codecs = self.decoders.keys().collect::<Vec<_>>();
        codecs.sort();
        f.debug_struct("DecoderRegistry")
            .field("codecs", &codecs)
            .finish()
    }
}

/// Raw, DAG-PB and DAG-CBOR.
impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::empty()
            .with(raw::RawDecoder)
            .with(dag_pb::DagPbDecoder)
            .with(dag_cbor::DagCborDecoder)
    }
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn with<D: NodeDecoder + 'static>(mut self, decoder: D) -> Self {
        self.register(decoder);
        self
    }

    /// Register a decoder, replacing any previous decoder for the same codec.
    pub fn register<D: NodeDecoder + 'static>(&mut self, decoder: D) {
        self.decoders.insert(decoder.codec(), Box::new(decoder));
    }

    pub fn supports(&self, codec: u64) -> bool {
        self.decoders.contains_key(&codec)
    }

    pub fn decode(&self, block: &Block) -> Result<Node, ExtractError> {
        let codec = block.codec();
        self.decoders
            .get(&codec)
            .ok_or(ExtractError::UnsupportedCodec {
                cid: *block.cid(),
                codec,
            })?
            .decode(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tests::cid_of;
    use crate::block::{DAG_PB_CODEC, RAW_CODEC};

    fn block(codec: u64, data: &'static [u8]) -> Block {
        Block::new(cid_of(codec, data), data)
    }

    #[test]
    fn test_unsupported_codec() {
        let registry = DecoderRegistry::default();
        let err = registry.decode(&block(0x0129, b"{}")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedCodec { codec: 0x0129, .. }));
    }

    #[test]
    fn test_empty_registry_rejects_everything() {
        let registry = DecoderRegistry::empty();
        assert!(!registry.supports(RAW_CODEC));
        assert!(matches!(
            registry.decode(&block(RAW_CODEC, b"raw")),
            Err(ExtractError::UnsupportedCodec { .. })
        ));
    }

    #[test]
    fn test_default_registry() {
        let registry = DecoderRegistry::default();
        assert!(registry.supports(RAW_CODEC));
        assert!(registry.supports(DAG_PB_CODEC));
        let node = registry.decode(&block(RAW_CODEC, b"raw")).unwrap();
        assert!(node.is_leaf());
    }
}
