//! Read-only parser and navigator for the UDF file system (ECMA-167) as
//! recorded on DVD-Video and Blu-ray optical media.
//!
//! This crate has no opinion about how logical blocks reach it — see
//! [`block_source::BlockSource`] — and performs no decryption; CSS-scrambled
//! sectors are the caller's concern. It reads the Anchor Volume Descriptor
//! Pointer, walks the Volume Descriptor Sequence, locates the File Set
//! Descriptor, and from there resolves paths and scans directories.

pub mod block_source;
pub mod cache;
pub mod crc;
pub mod descriptors;
pub mod directory;
pub mod error;
pub mod file;
pub mod icb;
pub mod osta;
pub mod reader;
pub mod volume;

/// Fixed logical block size used throughout this crate, matching the
/// 2048-byte sectors of DVD-Video and Blu-ray media.
pub const LOGICAL_BLOCK_SIZE: usize = 2048;

pub use directory::{DirectoryEntry, EntryType};
pub use error::{Result, UdfError};
pub use file::File;
pub use reader::Reader;
