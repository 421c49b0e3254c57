//! Reading the bytes of UnixFS files.
use bytes::Bytes;
use cid::Cid;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::block::Block;
use crate::blockstore::{Blockstore, Fetcher};
use crate::decoder::{DecoderRegistry, Marker, Node};
use crate::errors::ExtractError;
use crate::resolver::PathResolver;

/// The content of the file a path points to.
///
/// Chunked files are read leaf by leaf in link order. Inline data of a node comes before the data
/// of its children.
pub struct FileContent<'a, B> {
    resolver: PathResolver<'a, B>,
    fetcher: Fetcher<'a, B>,
    registry: &'a DecoderRegistry,
    path: String,
}

struct Pending {
    terminal: Option<Block>,
    stack: Vec<Cid>,
}

impl<'a, B> FileContent<'a, B>
where
    B: Blockstore + Sync,
{
    pub(crate) fn new(
        resolver: PathResolver<'a, B>,
        fetcher: Fetcher<'a, B>,
        registry: &'a DecoderRegistry,
        path: &str,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            registry,
            path: path.to_string(),
        }
    }

    /// Stream the file in chunks, one per block carrying data.
    pub fn stream(self) -> BoxStream<'a, Result<Bytes, ExtractError>> {
        let Self {
            resolver,
            fetcher,
            registry,
            path,
        } = self;
        let terminal = resolver.resolve_entry(&path).try_fold(None, |_, block| async move {
            Ok(Some(block))
        });

        stream::once(terminal)
            .map_ok(move |terminal| {
                let pending = Pending {
                    terminal,
                    stack: Vec::new(),
                };
                stream::try_unfold(pending, move |pending| next_chunk(fetcher, registry, pending))
            })
            .try_flatten()
            .boxed()
    }

    /// Write the whole file to `writer`, returning the number of bytes written.
    pub async fn write_to<W>(self, writer: &mut W) -> Result<u64, ExtractError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut chunks = self.stream();
        let mut written = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }
}

/// Depth-first walk over the blocks of a file, skipping blocks without data.
async fn next_chunk<B>(
    fetcher: Fetcher<'_, B>,
    registry: &DecoderRegistry,
    mut pending: Pending,
) -> Result<Option<(Bytes, Pending)>, ExtractError>
where
    B: Blockstore + Sync,
{
    loop {
        let block = match pending.terminal.take() {
            Some(block) => block,
            None => match pending.stack.pop() {
                Some(cid) => fetcher.fetch(cid).await?,
                None => return Ok(None),
            },
        };
        let (data, children) = file_parts(registry, &block)?;
        pending.stack.extend(children.into_iter().rev());
        if !data.is_empty() {
            return Ok(Some((data, pending)));
        }
    }
}

/// Inline data and child links of a block belonging to a file.
fn file_parts(registry: &DecoderRegistry, block: &Block) -> Result<(Bytes, Vec<Cid>), ExtractError> {
    match registry.decode(block)? {
        Node::Leaf(data) => Ok((data, Vec::new())),
        Node::Structured(node) => match node.marker() {
            Some(Marker::File(data)) => Ok((
                data.clone(),
                node.links().iter().map(|link| *link.cid()).collect(),
            )),
            _ => Err(ExtractError::NotAFile(*block.cid())),
        },
    }
}
