use ipld_dagpb::PbNode;

use super::{DirectoryNode, Link, Marker, Node, NodeDecoder};
use crate::block::{Block, DAG_PB_CODEC};
use crate::errors::ExtractError;
use crate::unixfs::Data;

/// Decoder for DAG-PB nodes, reading the UnixFS payload marker when there is one.
///
/// Nodes without a `Data` field have no marker and are walked by link name. A `Data` field that
/// does not parse as UnixFS is a decode error.
#[derive(Clone, Copy, Debug, Default)]
pub struct DagPbDecoder;

impl NodeDecoder for DagPbDecoder {
    fn codec(&self) -> u64 {
        DAG_PB_CODEC
    }

    fn decode(&self, block: &Block) -> Result<Node, ExtractError> {
        let node = PbNode::from_bytes(block.data().clone())
            .map_err(|e| ExtractError::decode(*block.cid(), e))?;
        let marker = node
            .data
            .as_deref()
            .map(Data::try_from)
            .transpose()
            .map_err(|e| ExtractError::decode(*block.cid(), e))?
            .map(|data| Marker::from(&data));
        let links = node.links.iter().map(Link::from).collect();
        Ok(Node::Structured(DirectoryNode::new(
            *block.cid(),
            marker,
            links,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use bytes::Bytes;
    use cid::Cid;
    use ipld_dagpb::PbLink;

    use super::*;
    use crate::block::tests::cid_of;
    use crate::block::RAW_CODEC;
    use crate::unixfs::{DataType, HAMT_HASH_MURMUR3};

    fn cid(codec: u64, data: &[u8]) -> Cid {
        cid_of(codec, data)
    }

    fn encode(data: Option<Data>, links: Vec<PbLink>) -> Block {
        let node = PbNode {
            links,
            data: data.map(|d| Bytes::from(d.to_bytes().unwrap())),
        };
        let bytes = node.into_bytes();
        Block::new(cid(DAG_PB_CODEC, &bytes), bytes)
    }

    #[test]
    fn test_decode_directory() {
        let target = cid(RAW_CODEC, b"one");
        let block = encode(
            Some(Data {
                Type: DataType::Directory,
                ..Default::default()
            }),
            vec![PbLink {
                cid: target,
                name: Some("one".to_string()),
                size: Some(3),
            }],
        );
        let Node::Structured(node) = DagPbDecoder.decode(&block).unwrap() else {
            panic!("expected a structured node");
        };
        assert_eq!(node.marker(), Some(&Marker::Directory));
        assert_eq!(node.find_link("one").map(Link::cid), Some(&target));
        assert!(node.find_link("two").is_none());
    }

    #[test]
    fn test_decode_hamt_marker() {
        let block = encode(
            Some(Data {
                Type: DataType::HAMTShard,
                Data: Some(Cow::Borrowed(&[0])),
                hashType: Some(HAMT_HASH_MURMUR3),
                fanout: Some(256),
                ..Default::default()
            }),
            vec![],
        );
        let Node::Structured(node) = DagPbDecoder.decode(&block).unwrap() else {
            panic!("expected a structured node");
        };
        assert!(node.is_hamt_shard());
        assert_eq!(node.shard_params().and_then(|p| p.fanout), Some(256));
    }

    #[test]
    fn test_decode_without_unixfs() {
        let block = encode(None, vec![]);
        let Node::Structured(node) = DagPbDecoder.decode(&block).unwrap() else {
            panic!("expected a structured node");
        };
        assert!(node.marker().is_none());
    }

    #[test]
    fn test_decode_malformed_unixfs_data() {
        // A lone `Type` tag with no value behind it.
        let node = PbNode {
            links: vec![],
            data: Some(Bytes::from_static(&[0x08])),
        };
        let bytes = node.into_bytes();
        let block = Block::new(cid(DAG_PB_CODEC, &bytes), bytes);
        assert!(matches!(
            DagPbDecoder.decode(&block),
            Err(ExtractError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let bytes = vec![0xff, 0x00, 0x13];
        let block = Block::new(cid(DAG_PB_CODEC, &bytes), bytes);
        assert!(matches!(
            DagPbDecoder.decode(&block),
            Err(ExtractError::Decode { .. })
        ));
    }
}
