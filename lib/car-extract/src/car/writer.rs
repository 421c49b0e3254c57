use cid::Cid;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::CarHeader;
use crate::block::Block;
use crate::errors::ExtractError;

/// Writes a CARv1 archive: the header first, then blocks in the order they are given.
///
/// The archive is only complete once [`CarWriter::finish`] returned.
pub struct CarWriter<W> {
    writer: W,
    blocks: usize,
}

impl<W> CarWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub async fn new(mut writer: W, roots: Vec<Cid>) -> Result<Self, ExtractError> {
        let header = serde_ipld_dagcbor::to_vec(&CarHeader::new(roots))
            .map_err(|e| ExtractError::InvalidCar(format!("failed to encode header: {e}")))?;
        write_frame(&mut writer, &[header.as_slice()]).await?;
        Ok(Self { writer, blocks: 0 })
    }

    pub async fn write(&mut self, block: &Block) -> Result<(), ExtractError> {
        let cid = block.cid().to_bytes();
        write_frame(&mut self.writer, &[cid.as_slice(), block.data().as_ref()]).await?;
        self.blocks += 1;
        Ok(())
    }

    /// Number of blocks written so far.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Flush and hand back the underlying writer.
    pub async fn finish(mut self) -> Result<W, ExtractError> {
        self.writer.flush().await?;
        Ok(self.writer)
    }
}

async fn write_frame<W>(writer: &mut W, parts: &[&[u8]]) -> Result<(), ExtractError>
where
    W: AsyncWrite + Unpin,
{
    let length = parts.iter().map(|part| part.len()).sum::<usize>();
    let mut buf = unsigned_varint::encode::usize_buffer();
    writer
        .write_all(unsigned_varint::encode::usize(length, &mut buf))
        .await?;
    for part in parts {
        writer.write_all(part).await?;
    }
    Ok(())
}
