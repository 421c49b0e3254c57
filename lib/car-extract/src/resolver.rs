//! Resolution of logical paths to the ordered list of blocks proving them.
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use cid::Cid;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::debug;

use crate::block::Block;
use crate::blockstore::{Blockstore, Fetcher};
use crate::decoder::{DecoderRegistry, DirectoryNode, Link, Marker, Node};
use crate::errors::ExtractError;
use crate::exporter::SubgraphExporter;
use crate::hamt::{HamtShardWalker, Located};

/// `<root-cid>[/segment]*`, with an optional leading and trailing slash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalPath {
    root: Cid,
    segments: Vec<String>,
}

impl LogicalPath {
    pub fn root(&self) -> &Cid {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for LogicalPath {
    type Err = ExtractError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ExtractError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut parts = trimmed.split('/');
        let root = match parts.next() {
            Some(root) if !root.is_empty() => root,
            _ => return Err(invalid("no root CID found in path")),
        };
        let root = Cid::try_from(root).map_err(|e| invalid(&e.to_string()))?;

        let segments = parts.map(str::to_string).collect::<Vec<_>>();
        if segments.iter().any(String::is_empty) {
            return Err(invalid("empty path segment"));
        }
        Ok(Self { root, segments })
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

enum State<'a> {
    Start(LogicalPath),
    Descend {
        current: Block,
        segments: VecDeque<String>,
    },
    Shard {
        located: BoxStream<'a, Result<Located, ExtractError>>,
        directory: Cid,
        name: String,
        segments: VecDeque<String>,
    },
    Export(BoxStream<'a, Result<Block, ExtractError>>),
    Done,
}

/// Turns a logical path into the blocks needed to verify it: the root, every block traversed to
/// reach the last segment, the terminal block, then the terminal's whole sub-graph.
pub struct PathResolver<'a, B> {
    fetcher: Fetcher<'a, B>,
    registry: &'a DecoderRegistry,
    exporter: SubgraphExporter<'a, B>,
}

impl<'a, B> Clone for PathResolver<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B> Copy for PathResolver<'a, B> {}

impl<'a, B> PathResolver<'a, B>
where
    B: Blockstore + Sync,
{
    pub(crate) fn new(
        fetcher: Fetcher<'a, B>,
        registry: &'a DecoderRegistry,
        exporter: SubgraphExporter<'a, B>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            exporter,
        }
    }

    /// Blocks of `path` followed by the sub-graph of its terminal block.
    pub fn resolve(&self, path: &str) -> BoxStream<'a, Result<Block, ExtractError>> {
        self.run(path, true)
    }

    /// Blocks of `path` only. The last block of a successful stream is the terminal block.
    pub fn resolve_entry(&self, path: &str) -> BoxStream<'a, Result<Block, ExtractError>> {
        self.run(path, false)
    }

    fn run(&self, path: &str, export: bool) -> BoxStream<'a, Result<Block, ExtractError>> {
        let path = match path.parse::<LogicalPath>() {
            Ok(path) => path,
            Err(e) => return stream::once(async { Err(e) }).boxed(),
        };
        let this = *self;
        stream::try_unfold(State::Start(path), move |state| async move {
            this.step(state, export).await
        })
        .boxed()
    }

    /// Advance until the next block is available.
    async fn step(
        self,
        mut state: State<'a>,
        export: bool,
    ) -> Result<Option<(Block, State<'a>)>, ExtractError> {
        loop {
            state = match state {
                State::Start(path) => {
                    debug!("resolving {path}");
                    let root = self.fetcher.fetch(path.root).await?;
                    let next = State::Descend {
                        current: root.clone(),
                        segments: path.segments.into(),
                    };
                    return Ok(Some((root, next)));
                },
                State::Descend {
                    current,
                    mut segments,
                } => match segments.pop_front() {
                    None if export => State::Export(self.exporter.export_descendants(current)),
                    None => return Ok(None),
                    Some(name) => {
                        let node = match self.registry.decode(&current)? {
                            Node::Leaf(_) => {
                                return Err(ExtractError::missing_entry(*current.cid(), &name))
                            },
                            Node::Structured(node) => node,
                        };

                        if !node.is_hamt_shard() {
                            if matches!(node.marker(), Some(Marker::Directory))
                                && node.links().iter().any(|link| link.name().is_none())
                            {
                                return Err(ExtractError::structural(
                                    *node.cid(),
                                    "directory link without a name",
                                ));
                            }
                            let (link, consumed) = find_path_link(&node, &name, &segments)
                                .ok_or_else(|| ExtractError::missing_entry(*node.cid(), &name))?;
                            segments.drain(..consumed);
                            let block = self.fetcher.fetch(*link.cid()).await?;
                            let next = State::Descend {
                                current: block.clone(),
                                segments,
                            };
                            return Ok(Some((block, next)));
                        }

                        debug!("looking up {name:?} in sharded directory {}", node.cid());
                        let walker = HamtShardWalker::with_fetcher(self.fetcher);
                        State::Shard {
                            directory: *node.cid(),
                            located: walker.descend(node, &name).boxed(),
                            name,
                            segments,
                        }
                    },
                },
                State::Shard {
                    mut located,
                    directory,
                    name,
                    segments,
                } => match located.next().await {
                    Some(Ok(Located::Shard(block))) => {
                        let next = State::Shard {
                            located,
                            directory,
                            name,
                            segments,
                        };
                        return Ok(Some((block, next)));
                    },
                    Some(Ok(Located::Entry(block))) => {
                        let next = State::Descend {
                            current: block.clone(),
                            segments,
                        };
                        return Ok(Some((block, next)));
                    },
                    Some(Err(e)) => return Err(e),
                    None => return Err(ExtractError::missing_entry(directory, &name)),
                },
                State::Export(mut blocks) => match blocks.next().await {
                    Some(block) => return Ok(Some((block?, State::Export(blocks)))),
                    None => State::Done,
                },
                State::Done => return Ok(None),
            };
        }
    }
}

/// The link named `name`. Links of nodes without a UnixFS marker may be named by a key path, in
/// which case `name` is joined with the following segments until a link matches. Returns the link
/// and how many of `rest` it used up.
fn find_path_link<'n>(
    node: &'n DirectoryNode,
    name: &str,
    rest: &VecDeque<String>,
) -> Option<(&'n Link, usize)> {
    if let Some(link) = node.find_link(name) {
        return Some((link, 0));
    }
    if node.marker().is_some() {
        return None;
    }
    let mut candidate = name.to_string();
    for (i, segment) in rest.iter().enumerate() {
        candidate.push('/');
        candidate.push_str(segment);
        if let Some(link) = node.find_link(&candidate) {
            return Some((link, i + 1));
        }
    }
    None
}
