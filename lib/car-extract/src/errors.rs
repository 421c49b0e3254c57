use cid::Cid;
use thiserror::Error;

/// Error type for path resolution and sub-graph export.
///
/// Every error is fatal for the stream that produced it: the first one terminates the sequence
/// and whatever blocks were already yielded must not be treated as a complete result.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extract error: Invalid path {path:?} - {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Extract error: Missing block - Cid {0}")]
    MissingBlock(Cid),

    #[error("Extract error: Unsupported codec {codec:#x} - Cid {cid}")]
    UnsupportedCodec { cid: Cid, codec: u64 },

    #[error("Extract error: No entry named {name:?} - Cid {cid}")]
    MissingEntry { cid: Cid, name: String },

    #[error("Extract error: Malformed node - Cid {cid} - {reason}")]
    StructuralError { cid: Cid, reason: String },

    #[error("Extract error: Error decoding block - Cid {cid} - {reason}")]
    Decode { cid: Cid, reason: String },

    #[error("Extract error: Not a file - Cid {0}")]
    NotAFile(Cid),

    #[error("Extract error: Blockstore error {0}")]
    Blockstore(String),

    #[error("Extract error: Invalid CAR - {0}")]
    InvalidCar(String),

    #[error("Extract error: Operation cancelled")]
    Cancelled,

    #[error("Extract error: IO error - {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub(crate) fn structural(cid: Cid, reason: impl Into<String>) -> Self {
        Self::StructuralError {
            cid,
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(cid: Cid, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            cid,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing_entry(cid: Cid, name: &str) -> Self {
        Self::MissingEntry {
            cid,
            name: name.to_string(),
        }
    }
}
