use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::block::Block;
use crate::blockstore::{Blockstore, Fetcher};
use crate::config::ExtractConfig;
use crate::content::FileContent;
use crate::decoder::{DecoderRegistry, DirectoryNode};
use crate::errors::ExtractError;
use crate::exporter::SubgraphExporter;
use crate::hamt::HamtShardWalker;
use crate::resolver::PathResolver;

/// Entry point bundling a blockstore with the decoders and settings used to walk it.
///
/// ```ignore
/// let extractor = Extractor::builder()
///     .blockstore(store)
///     .config(ExtractConfig { fetch_concurrency: 4 })
///     .build();
/// let blocks = extractor.resolve("bafy.../dir/file.txt");
/// ```
#[derive(TypedBuilder)]
pub struct Extractor<B> {
    blockstore: B,
    #[builder(default)]
    registry: DecoderRegistry,
    #[builder(default)]
    config: ExtractConfig,
    #[builder(default, setter(strip_option))]
    cancel: Option<CancellationToken>,
}

impl<B> Extractor<B>
where
    B: Blockstore + Sync,
{
    pub fn blockstore(&self) -> &B {
        &self.blockstore
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Blocks needed to verify `path`, followed by the whole sub-graph of its last segment.
    pub fn resolve(&self, path: &str) -> BoxStream<'_, Result<Block, ExtractError>> {
        self.resolver().resolve(path)
    }

    /// Blocks needed to verify `path`, ending with the block its last segment names.
    pub fn resolve_entry(&self, path: &str) -> BoxStream<'_, Result<Block, ExtractError>> {
        self.resolver().resolve_entry(path)
    }

    /// `block` and every block reachable from it, in pre-order.
    pub fn export(&self, block: Block) -> BoxStream<'_, Result<Block, ExtractError>> {
        self.exporter().export(block)
    }

    pub fn locate(
        &self,
        node: DirectoryNode,
        name: &str,
    ) -> BoxStream<'_, Result<Block, ExtractError>> {
        HamtShardWalker::with_fetcher(self.fetcher())
            .locate(node, name)
            .boxed()
    }

    /// Content of the UnixFS file at `path`.
    pub fn read_file(&self, path: &str) -> FileContent<'_, B> {
        FileContent::new(self.resolver(), self.fetcher(), &self.registry, path)
    }

    fn resolver(&self) -> PathResolver<'_, B> {
        PathResolver::new(self.fetcher(), &self.registry, self.exporter())
    }

    fn exporter(&self) -> SubgraphExporter<'_, B> {
        SubgraphExporter::new(
            self.fetcher(),
            &self.registry,
            self.config.fetch_concurrency,
        )
    }

    fn fetcher(&self) -> Fetcher<'_, B> {
        Fetcher::new(&self.blockstore, self.cancel.as_ref())
    }
}
