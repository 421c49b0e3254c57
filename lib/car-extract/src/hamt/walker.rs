use cid::Cid;
use futures::stream::{self, Stream};
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::bucket::{BucketId, BucketTrie, ROOT};
use crate::block::{Block, DAG_PB_CODEC};
use crate::blockstore::{Blockstore, Fetcher};
use crate::decoder::dag_pb::DagPbDecoder;
use crate::decoder::{DirectoryNode, Link, Node, NodeDecoder, ShardParams};
use crate::errors::ExtractError;
use crate::unixfs::HAMT_HASH_MURMUR3;

/// Length of the slot prefix every shard link name starts with.
const PREFIX_LEN: usize = 2;
const MIN_FANOUT: u64 = 32;
const MAX_FANOUT: u64 = 256;

/// Finds a single entry of a HAMT sharded directory, fetching only the shard blocks on the path
/// to it.
pub struct HamtShardWalker<'a, B> {
    fetcher: Fetcher<'a, B>,
}

impl<'a, B> HamtShardWalker<'a, B>
where
    B: Blockstore + Sync,
{
    pub fn new(blockstore: &'a B, cancel: Option<&'a CancellationToken>) -> Self {
        Self::with_fetcher(Fetcher::new(blockstore, cancel))
    }

    pub(crate) fn with_fetcher(fetcher: Fetcher<'a, B>) -> Self {
        Self { fetcher }
    }

    /// Look `name` up in the shard rooted at `node`.
    ///
    /// Yields every nested shard block fetched on the way down, in descent order, then the block
    /// of the entry. The stream ends without the entry block when the name is not in the shard.
    pub fn locate(
        &self,
        node: DirectoryNode,
        name: &str,
    ) -> impl Stream<Item = Result<Block, ExtractError>> + Send + 'a {
        self.descend(node, name).map_ok(Located::into_block)
    }

    /// Same as [`Self::locate`], telling sub-shards apart from the entry.
    pub(crate) fn descend(
        &self,
        node: DirectoryNode,
        name: &str,
    ) -> impl Stream<Item = Result<Located, ExtractError>> + Send + 'a {
        let fetcher = self.fetcher;
        let name = name.to_string();
        stream::try_unfold(Some((node, None)), move |state| {
            advance(fetcher, name.clone(), state)
        })
    }
}

/// The shard node to scan next, with the context of the levels above it.
type Level = Option<(DirectoryNode, Option<TraversalContext>)>;

async fn advance<B>(
    fetcher: Fetcher<'_, B>,
    name: String,
    state: Level,
) -> Result<Option<(Located, Level)>, ExtractError>
where
    B: Blockstore + Sync,
{
    let Some((node, context)) = state else {
        return Ok(None);
    };
    let mut context = match context {
        Some(context) => context,
        None => TraversalContext::new(&node)?,
    };

    match context.scan(&node, &name)? {
        None => {
            debug!("{name:?} is not in shard {}", node.cid());
            Ok(None)
        },
        Some(Lookup::Entry(cid)) => {
            let block = fetcher.fetch(cid).await?;
            Ok(Some((Located::Entry(block), None)))
        },
        Some(Lookup::Shard(cid)) => {
            context.depth += 1;
            debug!("descending into shard {cid} at depth {}", context.depth);
            let block = fetcher.fetch(cid).await?;
            let shard = decode_shard(&block, context.trie.bits())?;
            Ok(Some((Located::Shard(block), Some((shard, Some(context))))))
        },
    }
}

/// A block fetched while walking a shard.
#[derive(Debug)]
pub(crate) enum Located {
    Shard(Block),
    Entry(Block),
}

impl Located {
    pub(crate) fn into_block(self) -> Block {
        match self {
            Located::Shard(block) | Located::Entry(block) => block,
        }
    }
}

enum Lookup {
    Entry(Cid),
    Shard(Cid),
}

/// State carried from one shard level to the next.
struct TraversalContext {
    trie: BucketTrie,
    depth: usize,
    last_bucket: BucketId,
}

impl TraversalContext {
    fn new(node: &DirectoryNode) -> Result<Self, ExtractError> {
        let params = node
            .shard_params()
            .ok_or_else(|| ExtractError::structural(*node.cid(), "not a HAMT shard"))?;
        let bits = shard_bits(*node.cid(), params)?;
        Ok(Self {
            trie: BucketTrie::new(bits),
            depth: 1,
            last_bucket: ROOT,
        })
    }

    /// Add the links of `node` to the trie. Sub-shards go under the last bucket, entries are
    /// inserted from the root by their own hash.
    fn project(&mut self, node: &DirectoryNode) -> Result<(), ExtractError> {
        let cid = *node.cid();
        let mut entries = Vec::new();
        for link in node.links() {
            let (prefix, suffix) = split_name(cid, link)?;
            if !suffix.is_empty() {
                entries.push(suffix);
                continue;
            }
            let pos = parse_prefix(prefix)
                .filter(|pos| *pos < self.trie.table_size())
                .ok_or_else(|| {
                    ExtractError::structural(cid, format!("invalid sub-shard prefix {prefix:?}"))
                })?;
            self.trie.put_bucket_at(self.last_bucket, pos);
        }
        for entry in entries {
            self.trie
                .put(entry)
                .map_err(|e| ExtractError::structural(cid, e.to_string()))?;
        }
        Ok(())
    }

    fn scan(&mut self, node: &DirectoryNode, name: &str) -> Result<Option<Lookup>, ExtractError> {
        let cid = *node.cid();
        self.project(node)?;

        let (position, _) = self
            .trie
            .find_new_bucket_and_pos(name)
            .map_err(|e| ExtractError::structural(cid, e.to_string()))?;
        let path = self.trie.bucket_path(position.bucket);
        let slot = if path.len() > self.depth {
            self.last_bucket = path[self.depth];
            self.trie.pos_at_parent(self.last_bucket)
        } else {
            position.pos
        };
        let wanted = format!("{slot:02X}");

        for link in node.links() {
            let (prefix, suffix) = split_name(cid, link)?;
            if prefix != wanted {
                continue;
            }
            if suffix.is_empty() {
                return Ok(Some(Lookup::Shard(*link.cid())));
            }
            if suffix == name {
                return Ok(Some(Lookup::Entry(*link.cid())));
            }
        }
        Ok(None)
    }
}

fn split_name(cid: Cid, link: &Link) -> Result<(&str, &str), ExtractError> {
    let name = link
        .name()
        .ok_or_else(|| ExtractError::structural(cid, "shard link without a name"))?;
    match (name.get(..PREFIX_LEN), name.get(PREFIX_LEN..)) {
        (Some(prefix), Some(suffix)) => Ok((prefix, suffix)),
        _ => Err(ExtractError::structural(
            cid,
            format!("shard link name {name:?} is shorter than its prefix"),
        )),
    }
}

fn parse_prefix(prefix: &str) -> Option<usize> {
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    usize::from_str_radix(prefix, 16).ok()
}

/// Number of hash bits consumed per level.
fn shard_bits(cid: Cid, params: ShardParams) -> Result<u32, ExtractError> {
    match params.hash_type {
        Some(HAMT_HASH_MURMUR3) => {},
        Some(other) => {
            return Err(ExtractError::structural(
                cid,
                format!("unsupported hash type {other:#x}"),
            ))
        },
        None => return Err(ExtractError::structural(cid, "missing hash type")),
    }
    match params.fanout {
        Some(fanout)
            if fanout.is_power_of_two() && (MIN_FANOUT..=MAX_FANOUT).contains(&fanout) =>
        {
            Ok(fanout.trailing_zeros())
        },
        Some(fanout) => Err(ExtractError::structural(
            cid,
            format!("unsupported fanout {fanout}"),
        )),
        None => Err(ExtractError::structural(cid, "missing fanout")),
    }
}

/// Decode a block a routing pointer led to, which must be a shard with the same fanout.
fn decode_shard(block: &Block, bits: u32) -> Result<DirectoryNode, ExtractError> {
    let cid = *block.cid();
    if block.codec() != DAG_PB_CODEC {
        return Err(ExtractError::structural(cid, "sub-shard is not a DAG-PB node"));
    }
    let node = match DagPbDecoder.decode(block) {
        Ok(Node::Structured(node)) => node,
        _ => return Err(ExtractError::structural(cid, "sub-shard could not be decoded")),
    };
    let params = node
        .shard_params()
        .ok_or_else(|| ExtractError::structural(cid, "sub-shard is not a HAMT shard"))?;
    if shard_bits(cid, params)? != bits {
        return Err(ExtractError::structural(
            cid,
            "sub-shard fanout differs from its parent",
        ));
    }
    Ok(node)
}
