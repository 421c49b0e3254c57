//! This module provides the decoded view of a block the resolver and exporter work on.
use bytes::Bytes;
use cid::Cid;
use ipld_dagpb::PbLink;

use crate::unixfs::{Data, DataType};

/// A named link to another block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    cid: Cid,
    name: Option<String>,
    size: Option<u64>,
}

impl From<Cid> for Link {
    fn from(cid: Cid) -> Self {
        Self::new(cid, None, None)
    }
}

impl From<&PbLink> for Link {
    fn from(link: &PbLink) -> Self {
        Link::new(link.cid, link.name.clone(), link.size)
    }
}

impl Link {
    pub fn new(cid: Cid, name: Option<String>, size: Option<u64>) -> Self {
        Self { cid, name, size }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Parameters of a HAMT sharded directory, as declared by its UnixFS payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardParams {
    pub fanout: Option<u64>,
    pub hash_type: Option<u64>,
}

/// The UnixFS payload marker of a structured node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    Directory,
    HamtShard(ShardParams),
    /// A file or raw UnixFS node, with the bytes stored inline in this block.
    File(Bytes),
    Other(DataType),
}

impl From<&Data<'_>> for Marker {
    fn from(data: &Data<'_>) -> Self {
        match data.Type {
            DataType::Directory => Marker::Directory,
            DataType::HAMTShard => Marker::HamtShard(ShardParams {
                fanout: data.fanout,
                hash_type: data.hashType,
            }),
            DataType::File | DataType::Raw => Marker::File(
                data.Data
                    .as_deref()
                    .map(Bytes::copy_from_slice)
                    .unwrap_or_default(),
            ),
            ty => Marker::Other(ty),
        }
    }
}

/// A decoded block exposing an ordered list of outgoing links.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    cid: Cid,
    marker: Option<Marker>,
    links: Vec<Link>,
}

impl std::fmt::Debug for DirectoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryNode")
            .field("cid", &self.cid.to_string())
            .field("marker", &self.marker)
            .field("links", &self.links.len())
            .finish()
    }
}

impl DirectoryNode {
    pub fn new(cid: Cid, marker: Option<Marker>, links: Vec<Link>) -> Self {
        Self { cid, marker, links }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn shard_params(&self) -> Option<ShardParams> {
        match self.marker {
            Some(Marker::HamtShard(params)) => Some(params),
            _ => None,
        }
    }

    pub fn is_hamt_shard(&self) -> bool {
        self.shard_params().is_some()
    }

    /// First link whose name equals `name` exactly.
    pub fn find_link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.name() == Some(name))
    }
}

/// A decoded block: either a leaf without links, or a structured node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Bytes),
    Structured(DirectoryNode),
}

impl Node {
    pub fn links(&self) -> &[Link] {
        match self {
            Node::Leaf(_) => &[],
            Node::Structured(node) => node.links(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}
