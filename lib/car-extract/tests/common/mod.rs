#![allow(dead_code)]

use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::Bytes;
use car_extract::block::{DAG_CBOR_CODEC, DAG_PB_CODEC, RAW_CODEC};
use car_extract::hamt::hash::InfiniteHash;
use car_extract::unixfs::{Data, DataType, HAMT_HASH_MURMUR3};
use car_extract::{Block, Blockstore, MemoryBlockstore};
use cid::multihash::Multihash;
use cid::Cid;
use ipld_core::ipld::Ipld;
use ipld_dagpb::{PbLink, PbNode};
use sha2::{Digest, Sha256};

pub fn cid_of(codec: u64, data: &[u8]) -> Cid {
    let digest = Sha256::digest(data);
    Cid::new_v1(codec, Multihash::wrap(0x12, &digest).unwrap())
}

/// Builds UnixFS graphs into a [`MemoryBlockstore`], keeping every block it creates.
#[derive(Default)]
pub struct Fixture {
    pub store: MemoryBlockstore,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn block(&self, cid: &Cid) -> Block {
        self.store.get(cid).await.unwrap().unwrap()
    }

    fn put(&self, codec: u64, bytes: Vec<u8>) -> Cid {
        let cid = cid_of(codec, &bytes);
        self.store.put(Block::new(cid, bytes));
        cid
    }

    fn put_pb(&self, data: Data, links: Vec<PbLink>) -> Cid {
        let node = PbNode {
            links,
            data: Some(Bytes::from(data.to_bytes().unwrap())),
        };
        self.put(DAG_PB_CODEC, node.into_bytes())
    }

    pub fn raw(&self, data: &[u8]) -> Cid {
        self.put(RAW_CODEC, data.to_vec())
    }

    /// A UnixFS file. A single chunk becomes a raw leaf, several chunks a DAG-PB file node
    /// linking to raw leaves.
    pub fn file(&self, chunks: &[&[u8]]) -> Cid {
        if let [chunk] = chunks {
            return self.raw(chunk);
        }
        let links = chunks
            .iter()
            .map(|chunk| PbLink {
                cid: self.raw(chunk),
                name: Some(String::new()),
                size: Some(chunk.len() as u64),
            })
            .collect();
        let data = Data {
            Type: DataType::File,
            filesize: Some(chunks.iter().map(|chunk| chunk.len() as u64).sum()),
            blocksizes: chunks.iter().map(|chunk| chunk.len() as u64).collect(),
            ..Default::default()
        };
        self.put_pb(data, links)
    }

    /// A UnixFS file node holding `inline` itself and linking to `children`.
    pub fn file_node(&self, inline: &[u8], children: &[Cid]) -> Cid {
        let data = Data {
            Type: DataType::File,
            Data: Some(Cow::Borrowed(inline)),
            ..Default::default()
        };
        let links = children
            .iter()
            .map(|cid| PbLink {
                cid: *cid,
                name: Some(String::new()),
                size: None,
            })
            .collect();
        self.put_pb(data, links)
    }

    pub fn dir(&self, entries: &[(&str, Cid)]) -> Cid {
        let data = Data {
            Type: DataType::Directory,
            ..Default::default()
        };
        self.put_pb(data, named_links(entries.iter().map(|(n, c)| (n.to_string(), *c))))
    }

    /// A UnixFS directory with hand made links, names included or not.
    pub fn dir_links(&self, links: Vec<PbLink>) -> Cid {
        let data = Data {
            Type: DataType::Directory,
            ..Default::default()
        };
        self.put_pb(data, links)
    }

    /// A HAMT sharded directory laid out the way go-unixfs lays it out: one slot per hash chunk,
    /// entries sharing a slot pushed into a nested shard.
    pub fn hamt_dir(&self, entries: &[(&str, Cid)], fanout: u64) -> Cid {
        let bits = fanout.trailing_zeros();
        let entries = entries
            .iter()
            .map(|(name, cid)| (name.to_string(), *cid, InfiniteHash::new(*name)))
            .collect();
        self.shard(entries, bits, fanout)
    }

    fn shard(&self, entries: Vec<(String, Cid, InfiniteHash)>, bits: u32, fanout: u64) -> Cid {
        let mut slots: BTreeMap<usize, Vec<(String, Cid, InfiniteHash)>> = BTreeMap::new();
        for (name, cid, mut hash) in entries {
            let slot = hash.take(bits).unwrap();
            slots.entry(slot).or_default().push((name, cid, hash));
        }

        let mut bitfield = vec![0u8; (fanout as usize).div_ceil(8)];
        let mut links = Vec::new();
        for (slot, mut group) in slots {
            let len = bitfield.len();
            bitfield[len - 1 - slot / 8] |= 1 << (slot % 8);
            let prefix = format!("{slot:02X}");
            if group.len() == 1 {
                let (name, cid, _) = group.remove(0);
                links.push((format!("{prefix}{name}"), cid));
            } else {
                links.push((prefix, self.shard(group, bits, fanout)));
            }
        }

        let data = Data {
            Type: DataType::HAMTShard,
            Data: Some(Cow::Owned(bitfield)),
            hashType: Some(HAMT_HASH_MURMUR3),
            fanout: Some(fanout),
            ..Default::default()
        };
        self.put_pb(data, named_links(links))
    }

    pub fn dag_cbor(&self, ipld: &Ipld) -> Cid {
        self.put(DAG_CBOR_CODEC, serde_ipld_dagcbor::to_vec(ipld).unwrap())
    }
}

fn named_links(entries: impl IntoIterator<Item = (String, Cid)>) -> Vec<PbLink> {
    entries
        .into_iter()
        .map(|(name, cid)| PbLink {
            cid,
            name: Some(name),
            size: None,
        })
        .collect()
}

pub fn cids(blocks: &[Block]) -> Vec<Cid> {
    blocks.iter().map(|block| *block.cid()).collect()
}
