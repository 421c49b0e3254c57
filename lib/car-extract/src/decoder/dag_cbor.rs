use ipld_core::ipld::Ipld;

use super::{DirectoryNode, Link, Node, NodeDecoder};
use crate::block::{Block, DAG_CBOR_CODEC};
use crate::errors::ExtractError;

/// Decoder for DAG-CBOR blocks.
///
/// Links are collected in document order and named by their position in the document: map keys
/// and list indexes joined with `/`. A link stored under the top level key `prev` is named `prev`
/// and one at `list[0]` is named `list/0`. Both are reachable by path, with `list/0` consuming two
/// path segments.
#[derive(Clone, Copy, Debug, Default)]
pub struct DagCborDecoder;

impl NodeDecoder for DagCborDecoder {
    fn codec(&self) -> u64 {
        DAG_CBOR_CODEC
    }

    fn decode(&self, block: &Block) -> Result<Node, ExtractError> {
        let ipld: Ipld = serde_ipld_dagcbor::from_slice(block.data())
            .map_err(|e| ExtractError::decode(*block.cid(), e))?;
        Ok(Node::Structured(DirectoryNode::new(
            *block.cid(),
            None,
            collect_links(&ipld),
        )))
    }
}

fn collect_links(root: &Ipld) -> Vec<Link> {
    let mut links = Vec::new();
    // Children are pushed in reverse so they are visited in document order.
    let mut stack = vec![(String::new(), root)];
    while let Some((path, ipld)) = stack.pop() {
        match ipld {
            Ipld::Link(cid) => {
                let name = (!path.is_empty()).then_some(path);
                links.push(Link::new(*cid, name, None));
            },
            Ipld::List(list) => {
                for (i, item) in list.iter().enumerate().rev() {
                    stack.push((join(&path, &i.to_string()), item));
                }
            },
            Ipld::Map(map) => {
                for (key, item) in map.iter().rev() {
                    stack.push((join(&path, key), item));
                }
            },
            _ => {},
        }
    }
    links
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use cid::Cid;

    use super::*;
    use crate::block::tests::cid_of;
    use crate::block::RAW_CODEC;

    fn cid(codec: u64, data: &[u8]) -> Cid {
        cid_of(codec, data)
    }

    #[test]
    fn test_links_are_named_by_path() {
        let a = cid(RAW_CODEC, b"a");
        let b = cid(RAW_CODEC, b"b");
        let c = cid(RAW_CODEC, b"c");
        let ipld = Ipld::Map(BTreeMap::from([
            ("first".to_string(), Ipld::Link(a)),
            (
                "nested".to_string(),
                Ipld::List(vec![Ipld::Integer(1), Ipld::Link(b)]),
            ),
            ("zeta".to_string(), Ipld::Link(c)),
        ]));
        let bytes = serde_ipld_dagcbor::to_vec(&ipld).unwrap();
        let block = Block::new(cid(DAG_CBOR_CODEC, &bytes), bytes);

        let node = DagCborDecoder.decode(&block).unwrap();
        let links = node
            .links()
            .iter()
            .map(|l| (l.name().unwrap().to_string(), *l.cid()))
            .collect::<Vec<_>>();
        assert_eq!(
            links,
            vec![
                ("first".to_string(), a),
                ("nested/1".to_string(), b),
                ("zeta".to_string(), c),
            ]
        );
    }

    #[test]
    fn test_invalid_cbor() {
        let bytes = vec![0xff];
        let block = Block::new(cid(DAG_CBOR_CODEC, &bytes), bytes);
        assert!(matches!(
            DagCborDecoder.decode(&block),
            Err(ExtractError::Decode { .. })
        ));
    }
}
