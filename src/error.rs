use std::io;

use thiserror::Error;

/// Errors that can abort a single operation. Per the error-handling design,
/// "not found" and "I/O underrun" are not represented here — they collapse
/// to `Option::None` / `bool` at the call site instead of an `Err`.
#[derive(Error, Debug)]
pub enum UdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid descriptor tag: expected {expected}, found {found}")]
    InvalidDescriptorTag { expected: u16, found: u16 },
    #[error("invalid partition map")]
    InvalidPartitionMap,
    #[error("buffer too small")]
    BufferTooSmall,
    #[error("invalid offset")]
    InvalidOffset,
    #[error("invalid partition number: {0}")]
    InvalidPartitionNumber(u16),
    #[error("unsupported logical block size: {0}")]
    UnsupportedLogicalBlockSize(u32),
    #[error("allocation descriptor chain exceeds UDF_MAX_AD_CHAINS")]
    AdChainCapacityExceeded,
    #[error("anchor volume descriptor pointer not found")]
    AnchorNotFound,
    #[error("root directory sanity check failed")]
    RootSanityCheckFailed,
    #[error("file set descriptor not found")]
    FileSetNotFound,
}

pub type Result<T> = std::result::Result<T, UdfError>;
