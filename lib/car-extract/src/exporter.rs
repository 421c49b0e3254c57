//! Depth-first export of every block reachable from a given block.
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::trace;

use crate::block::Block;
use crate::blockstore::{Blockstore, Fetcher};
use crate::decoder::{DecoderRegistry, Link, Node};
use crate::errors::ExtractError;

type Frame<'a> = BoxStream<'a, Result<Block, ExtractError>>;

/// Emits a sub-graph in pre-order, following links in the order they appear in each node.
///
/// Blocks reachable through several links are emitted once per link. Sibling fetches of the same
/// node run concurrently up to `concurrency`, emission order is unaffected by it.
///
/// A failed fetch is reported at its position in that order. Every block before it, including
/// the whole sub-graphs of earlier siblings, is emitted first, and prefetched siblings are
/// dropped unread once the error is out.
pub struct SubgraphExporter<'a, B> {
    fetcher: Fetcher<'a, B>,
    registry: &'a DecoderRegistry,
    concurrency: usize,
}

impl<'a, B> Clone for SubgraphExporter<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B> Copy for SubgraphExporter<'a, B> {}

/// One pending block plus the frames of fetched-but-unvisited children, deepest last.
struct Worklist<'a> {
    start: Option<(Block, bool)>,
    frames: Vec<Frame<'a>>,
}

impl<'a, B> SubgraphExporter<'a, B>
where
    B: Blockstore + Sync,
{
    pub(crate) fn new(
        fetcher: Fetcher<'a, B>,
        registry: &'a DecoderRegistry,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// `block` followed by all of its descendants.
    pub fn export(&self, block: Block) -> BoxStream<'a, Result<Block, ExtractError>> {
        self.walk(block, true)
    }

    /// All descendants of `block`, without `block` itself.
    pub fn export_descendants(&self, block: Block) -> BoxStream<'a, Result<Block, ExtractError>> {
        self.walk(block, false)
    }

    fn walk(&self, block: Block, emit_start: bool) -> BoxStream<'a, Result<Block, ExtractError>> {
        let this = *self;
        let worklist = Worklist {
            start: Some((block, emit_start)),
            frames: Vec::new(),
        };
        stream::try_unfold(worklist, move |worklist| this.advance(worklist)).boxed()
    }

    async fn advance(
        self,
        mut worklist: Worklist<'a>,
    ) -> Result<Option<(Block, Worklist<'a>)>, ExtractError> {
        if let Some((block, emit)) = worklist.start.take() {
            self.expand(&block, &mut worklist.frames)?;
            if emit {
                return Ok(Some((block, worklist)));
            }
        }

        while let Some(frame) = worklist.frames.last_mut() {
            match frame.next().await {
                Some(block) => {
                    let block = block?;
                    self.expand(&block, &mut worklist.frames)?;
                    return Ok(Some((block, worklist)));
                },
                None => {
                    worklist.frames.pop();
                },
            }
        }
        Ok(None)
    }

    /// Decode `block` and queue the fetches of its children.
    fn expand(&self, block: &Block, frames: &mut Vec<Frame<'a>>) -> Result<(), ExtractError> {
        match self.registry.decode(block)? {
            Node::Leaf(_) => {},
            Node::Structured(node) if node.links().is_empty() => {},
            Node::Structured(node) => {
                trace!("queueing {} links of {}", node.links().len(), node.cid());
                frames.push(self.fetch_all(node.links()));
            },
        }
        Ok(())
    }

    fn fetch_all(&self, links: &[Link]) -> Frame<'a> {
        let fetcher = self.fetcher;
        let cids = links.iter().map(|link| *link.cid()).collect::<Vec<_>>();
        tokio_stream::iter(cids)
            .map(move |cid| fetcher.fetch(cid))
            .buffered(self.concurrency)
            .boxed()
    }
}
