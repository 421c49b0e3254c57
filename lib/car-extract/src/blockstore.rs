//! This module provides the `Blockstore` trait the resolver reads from, and an in-memory
//! implementation of it.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use cid::Cid;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::block::Block;
use crate::errors::ExtractError;

/// Read-only key to block lookup.
///
/// `Ok(None)` means the store has no content for the key. Errors are reserved for failures of the
/// store itself (I/O, corrupt index) and are never used to signal absence.
///
/// **Note**: `async_trait` is not used here so implementations can stay zero-cost and callers can
/// require `Send` futures.
pub trait Blockstore {
    fn get(
        &self,
        cid: &Cid,
    ) -> impl Future<Output = Result<Option<Block>, ExtractError>> + Send;

    fn has(&self, cid: &Cid) -> impl Future<Output = Result<bool, ExtractError>> + Send;
}

/// A blockstore that keeps every block in memory.
#[derive(Clone, Default)]
pub struct MemoryBlockstore {
    inner: Arc<RwLock<HashMap<Cid, Block>>>,
}

impl MemoryBlockstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, block: Block) {
        self.inner.write().insert(*block.cid(), block);
    }

    pub fn remove(&self, cid: &Cid) -> Option<Block> {
        self.inner.write().remove(cid)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl FromIterator<Block> for MemoryBlockstore {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let store = Self::new();
        for block in iter {
            store.put(block);
        }
        store
    }
}

impl Blockstore for MemoryBlockstore {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, ExtractError> {
        Ok(self.inner.read().get(cid).cloned())
    }

    async fn has(&self, cid: &Cid) -> Result<bool, ExtractError> {
        Ok(self.inner.read().contains_key(cid))
    }
}

/// Fetches required blocks from a blockstore, turning absence into `MissingBlock` and checking
/// for cancellation at every fetch boundary.
pub(crate) struct Fetcher<'a, B> {
    blockstore: &'a B,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, B> Clone for Fetcher<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B> Copy for Fetcher<'a, B> {}

impl<'a, B> Fetcher<'a, B>
where
    B: Blockstore + Sync,
{
    pub(crate) fn new(blockstore: &'a B, cancel: Option<&'a CancellationToken>) -> Self {
        Self { blockstore, cancel }
    }

    pub(crate) async fn fetch(self, cid: Cid) -> Result<Block, ExtractError> {
        self.check_cancelled()?;
        trace!("fetching block {cid}");
        let block = self
            .blockstore
            .get(&cid)
            .await?
            .ok_or(ExtractError::MissingBlock(cid))?;
        self.check_cancelled()?;
        Ok(block)
    }

    fn check_cancelled(&self) -> Result<(), ExtractError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(ExtractError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::block::tests::cid_of;
    use crate::block::RAW_CODEC;

    fn raw_block(data: &'static [u8]) -> Block {
        let cid = cid_of(RAW_CODEC, data);
        Block::new(cid, data)
    }

    #[tokio::test]
    async fn test_memory_get_and_has() {
        let block = raw_block(b"hello");
        let store = MemoryBlockstore::from_iter([block.clone()]);
        assert_eq!(store.get(block.cid()).await.unwrap(), Some(block.clone()));
        assert!(store.has(block.cid()).await.unwrap());

        store.remove(block.cid());
        assert!(store.get(block.cid()).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_block() {
        let block = raw_block(b"absent");
        let store = MemoryBlockstore::new();
        let fetcher = Fetcher::new(&store, None);
        let err = fetcher.fetch(*block.cid()).await.unwrap_err();
        assert!(matches!(err, ExtractError::MissingBlock(cid) if cid == *block.cid()));
    }

    #[tokio::test]
    async fn test_fetch_cancelled() {
        let block = raw_block(b"present");
        let store = MemoryBlockstore::from_iter([block.clone()]);
        let token = CancellationToken::new();
        token.cancel();
        let fetcher = Fetcher::new(&store, Some(&token));
        let err = fetcher.fetch(*block.cid()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Cancelled));
    }
}
