use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use cid::Cid;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

use super::CarReader;
use crate::block::Block;
use crate::blockstore::Blockstore;
use crate::errors::ExtractError;

/// A blockstore over a CAR file on disk.
///
/// The file is scanned once when opened to record where each block's data lives, blocks are then
/// read on demand. When a CID appears several times the first occurrence wins.
pub struct CarBlockstore {
    path: PathBuf,
    roots: Vec<Cid>,
    order: Vec<Cid>,
    index: HashMap<Cid, (u64, usize)>,
    file: Mutex<File>,
}

impl std::fmt::Debug for CarBlockstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarBlockstore")
            .field("path", &self.path)
            .field("roots", &self.roots)
            .field("blocks", &self.index.len())
            .finish()
    }
}

impl CarBlockstore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = CarReader::new(BufReader::new(File::open(&path).await?)).await?;

        let mut order = Vec::new();
        let mut index = HashMap::new();
        while let Some(frame) = reader.next_frame().await? {
            order.push(frame.cid);
            index
                .entry(frame.cid)
                .or_insert((frame.data_offset, frame.data.len()));
        }
        debug!("indexed {} blocks of {}", index.len(), path.display());

        Ok(Self {
            roots: reader.roots().to_vec(),
            file: Mutex::new(File::open(&path).await?),
            path,
            order,
            index,
        })
    }

    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// CIDs of the archive's blocks in the order they are stored, duplicates included.
    pub fn cids(&self) -> &[Cid] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn blockstore_error(&self, e: std::io::Error) -> ExtractError {
        ExtractError::Blockstore(format!("{}: {e}", self.path.display()))
    }
}

impl Blockstore for CarBlockstore {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, ExtractError> {
        let Some(&(offset, length)) = self.index.get(cid) else {
            return Ok(None);
        };
        let mut data = vec![0; length];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.blockstore_error(e))?;
        file.read_exact(&mut data)
            .await
            .map_err(|e| self.blockstore_error(e))?;
        Ok(Some(Block::new(*cid, data)))
    }

    async fn has(&self, cid: &Cid) -> Result<bool, ExtractError> {
        Ok(self.index.contains_key(cid))
    }
}
