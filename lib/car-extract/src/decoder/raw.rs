use super::{Node, NodeDecoder};
use crate::block::{Block, RAW_CODEC};
use crate::errors::ExtractError;

/// Raw blocks are leaves: their bytes are the payload and they never link anywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDecoder;

impl NodeDecoder for RawDecoder {
    fn codec(&self) -> u64 {
        RAW_CODEC
    }

    fn decode(&self, block: &Block) -> Result<Node, ExtractError> {
        Ok(Node::Leaf(block.data().clone()))
    }
}
