use std::io::Cursor;

use bytes::Bytes;
use cid::Cid;
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{CarV2Header, MAX_ALLOC};
use crate::block::Block;
use crate::errors::ExtractError;

/// Either a CARv1 header or the CARv2 pragma, which only carries a version.
#[derive(Deserialize)]
struct HeaderProbe {
    #[serde(default)]
    roots: Vec<Cid>,
    version: u64,
}

/// A block frame together with where its data starts in the underlying reader.
pub(crate) struct Frame {
    pub cid: Cid,
    pub data: Vec<u8>,
    pub data_offset: u64,
}

/// Sequential reader over the blocks of a CARv1 or CARv2 archive.
pub struct CarReader<R> {
    reader: R,
    version: u64,
    roots: Vec<Cid>,
    /// Bytes consumed from `reader` so far.
    offset: u64,
    /// End of the data section of a CARv2 file. CARv1 data runs until EOF.
    data_end: Option<u64>,
}

impl<R> CarReader<R>
where
    R: AsyncRead + Unpin,
{
    pub async fn new(mut reader: R) -> Result<Self, ExtractError> {
        let mut offset = 0;
        let probe = read_header(&mut reader, &mut offset).await?;
        match probe.version {
            1 => Ok(Self {
                reader,
                version: 1,
                roots: probe.roots,
                offset,
                data_end: None,
            }),
            2 => {
                let mut buf = [0; CarV2Header::SIZE];
                reader.read_exact(&mut buf).await?;
                offset += CarV2Header::SIZE as u64;
                let header = CarV2Header::from_bytes(&buf);

                if header.data_offset < offset {
                    return Err(invalid("data section overlaps the CARv2 header"));
                }
                // Padding between the header and the data section has no size limit in the
                // format, bound it anyway.
                let padding = header.data_offset - offset;
                if padding > MAX_ALLOC as u64 {
                    return Err(invalid("CARv2 padding too large"));
                }
                tokio::io::copy(&mut (&mut reader).take(padding), &mut tokio::io::sink()).await?;
                offset += padding;

                let inner = read_header(&mut reader, &mut offset).await?;
                if inner.version != 1 {
                    return Err(invalid(format!(
                        "unexpected wrapped CAR version {}",
                        inner.version
                    )));
                }
                Ok(Self {
                    reader,
                    version: 2,
                    roots: inner.roots,
                    offset,
                    data_end: Some(header.data_offset + header.data_size),
                })
            },
            version => Err(invalid(format!("unsupported CAR version {version}"))),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    pub async fn next_block(&mut self) -> Result<Option<Block>, ExtractError> {
        Ok(self.next_frame().await?.map(Frame::into_block))
    }

    /// All remaining blocks, in archive order.
    pub fn into_stream(self) -> impl Stream<Item = Result<Block, ExtractError>> {
        stream::try_unfold(self, |mut reader| async move {
            let block = reader.next_block().await?;
            Ok::<_, ExtractError>(block.map(|block| (block, reader)))
        })
    }

    pub(crate) async fn next_frame(&mut self) -> Result<Option<Frame>, ExtractError> {
        if matches!(self.data_end, Some(end) if self.offset >= end) {
            return Ok(None);
        }
        let Some((length, varint_len)) = read_varint_usize(&mut self.reader).await? else {
            return Ok(None);
        };
        if length > MAX_ALLOC {
            return Err(invalid("data block too large"));
        }
        let mut buf = vec![0; length];
        self.reader.read_exact(&mut buf).await?;

        let mut cursor = Cursor::new(&buf[..]);
        let cid = Cid::read_bytes(&mut cursor).map_err(|e| invalid(e.to_string()))?;
        let cid_len = cursor.position() as usize;
        let data_offset = self.offset + (varint_len + cid_len) as u64;
        self.offset += (varint_len + length) as u64;

        buf.drain(..cid_len);
        Ok(Some(Frame {
            cid,
            data: buf,
            data_offset,
        }))
    }
}

impl Frame {
    pub(crate) fn into_block(self) -> Block {
        Block::new(self.cid, Bytes::from(self.data))
    }
}

fn invalid(reason: impl Into<String>) -> ExtractError {
    ExtractError::InvalidCar(reason.into())
}

async fn read_header<R>(reader: &mut R, offset: &mut u64) -> Result<HeaderProbe, ExtractError>
where
    R: AsyncRead + Unpin,
{
    let Some((length, varint_len)) = read_varint_usize(reader).await? else {
        return Err(invalid("missing header"));
    };
    if length > MAX_ALLOC {
        return Err(invalid("header too large"));
    }
    let mut buf = vec![0; length];
    reader.read_exact(&mut buf).await?;
    *offset += (varint_len + length) as u64;

    serde_ipld_dagcbor::from_slice(&buf).map_err(|e| invalid(format!("failed to decode header: {e}")))
}

/// Read a varint, returning the value and its encoded length. Returns `Ok(None)` on a clean EOF.
async fn read_varint_usize<R>(reader: &mut R) -> Result<Option<(usize, usize)>, ExtractError>
where
    R: AsyncRead + Unpin,
{
    let mut b = unsigned_varint::encode::usize_buffer();
    for i in 0..b.len() {
        let n = reader.read(&mut b[i..i + 1]).await?;
        if n == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(invalid("truncated varint"));
        }
        if unsigned_varint::decode::is_last(b[i]) {
            let (num, _) =
                unsigned_varint::decode::usize(&b[..=i]).map_err(|e| invalid(e.to_string()))?;
            return Ok(Some((num, i + 1)));
        }
    }
    Err(invalid("varint overflow"))
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::block::tests::cid_of;
    use crate::block::RAW_CODEC;
    use crate::car::{CarHeader, CarWriter};

    /// `{"version": 2}` behind its length prefix.
    const PRAGMA_V2: [u8; 11] = [
        0x0a, 0xa1, 0x67, 0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e, 0x02,
    ];

    fn raw_block(data: &'static [u8]) -> Block {
        Block::new(cid_of(RAW_CODEC, data), data)
    }

    async fn car_v1(blocks: &[Block]) -> Vec<u8> {
        let mut writer = CarWriter::new(Vec::new(), vec![*blocks[0].cid()])
            .await
            .unwrap();
        for block in blocks {
            writer.write(block).await.unwrap();
        }
        writer.finish().await.unwrap()
    }

    #[tokio::test]
    async fn test_read_v1() {
        let blocks = vec![raw_block(b"one"), raw_block(b"two")];
        let bytes = car_v1(&blocks).await;

        let reader = CarReader::new(&bytes[..]).await.unwrap();
        assert_eq!(reader.version(), 1);
        assert_eq!(reader.roots(), &[*blocks[0].cid()]);
        let read = reader.into_stream().try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(read, blocks);
    }

    #[tokio::test]
    async fn test_header_is_canonical() {
        let cid = *raw_block(b"root").cid();
        let bytes = serde_ipld_dagcbor::to_vec(&CarHeader::new(vec![cid])).unwrap();
        let decoded: CarHeader = serde_ipld_dagcbor::from_slice(&bytes).unwrap();
        assert_eq!(decoded, CarHeader::new(vec![cid]));
        // Map of two entries whose first key is "roots".
        assert_eq!(&bytes[..7], &[0xa2, 0x65, b'r', b'o', b'o', b't', b's']);
    }

    #[tokio::test]
    async fn test_read_v2() {
        let blocks = vec![raw_block(b"one"), raw_block(b"two")];
        let inner = car_v1(&blocks).await;
        let padding = 5;
        let data_offset = (PRAGMA_V2.len() + CarV2Header::SIZE + padding) as u64;

        let mut bytes = PRAGMA_V2.to_vec();
        bytes.extend_from_slice(&[0; 16]);
        bytes.extend_from_slice(&data_offset.to_le_bytes());
        bytes.extend_from_slice(&(inner.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&[0; 5]);
        bytes.extend_from_slice(&inner);
        // Trailing bytes standing in for an index must not be read as blocks.
        bytes.extend_from_slice(&[0x01, 0x02, 0x03]);

        let reader = CarReader::new(&bytes[..]).await.unwrap();
        assert_eq!(reader.version(), 2);
        assert_eq!(reader.roots(), &[*blocks[0].cid()]);
        let read = reader.into_stream().try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(read, blocks);
    }

    #[tokio::test]
    async fn test_reject_garbage() {
        assert!(matches!(
            CarReader::new(&[][..]).await,
            Err(ExtractError::InvalidCar(_))
        ));
        assert!(matches!(
            CarReader::new(&[0x02, 0xff, 0xff][..]).await,
            Err(ExtractError::InvalidCar(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_block() {
        let bytes = car_v1(&[raw_block(b"one")]).await;
        let truncated = &bytes[..bytes.len() - 1];
        let mut reader = CarReader::new(truncated).await.unwrap();
        assert!(matches!(reader.next_block().await, Err(ExtractError::Io(_))));
    }
}
