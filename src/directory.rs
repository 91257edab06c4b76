//! Directory content iteration.
//!
//! File Identifier Descriptors are ~38-48 bytes and are packed back to
//! back within a directory's data extents, so one can straddle a
//! 2048-byte block boundary. This keeps a two-block sliding window over
//! the directory's content and re-reads it only when the read position
//! crosses into a new base block, rather than pulling the whole extent
//! into memory at once.

use crate::block_source::BlockSource;
use crate::cache::BlockCache;
use crate::descriptors::{FileIdentifierDescriptor, LongAd};
use crate::file::{block_for_dir, File};
use crate::LOGICAL_BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    /// False if the name was only decodable lossily (see `osta::decode_lossy`).
    pub name_ok: bool,
    pub entry_type: EntryType,
    pub icb: LongAd,
}

/// Scans a directory's content, returning the entries found and whether
/// the scan completed cleanly. A `false` completion flag means an
/// underlying block read failed partway through — the entries collected
/// up to that point are still returned, per the "I/O underrun" contract.
///
/// `fsd_location` is the owning partition's File Set Descriptor location;
/// directory content is always addressed relative to it, never to the
/// partition's raw starting location (`UDFFileBlockDir` in `dvd_udf.c`).
pub fn scan_dir<S: BlockSource>(
    cache: &mut BlockCache<S>,
    fsd_location: u32,
    logical_block_size: u32,
    dir: &File,
) -> (Vec<DirectoryEntry>, bool) {
    if let Some(content) = &dir.embedded_content {
        return (parse_fids(content), true);
    }

    let mut entries = Vec::new();
    let mut offset: u64 = 0;
    let total = dir.information_length;
    let mut window: Option<(u32, [u8; LOGICAL_BLOCK_SIZE], [u8; LOGICAL_BLOCK_SIZE])> = None;

    while offset < total {
        let block_num = (offset / logical_block_size as u64) as u32;
        let reload = match &window {
            Some((base, _, _)) => *base != block_num,
            None => true,
        };
        if reload {
            let abs_block = match block_for_dir(&dir.allocation_descriptors, fsd_location, logical_block_size, offset) {
                Some(b) => b,
                None => return (entries, false),
            };
            let b0 = match cache.read_block(abs_block) {
                Some(b) => b,
                None => return (entries, false),
            };
            let b1 = cache.read_block(abs_block + 1).unwrap_or([0u8; LOGICAL_BLOCK_SIZE]);
            window = Some((block_num, b0, b1));
        }
        let (_, b0, b1) = window.as_ref().unwrap();
        let mut combined = [0u8; LOGICAL_BLOCK_SIZE * 2];
        combined[..LOGICAL_BLOCK_SIZE].copy_from_slice(b0);
        combined[LOGICAL_BLOCK_SIZE..].copy_from_slice(b1);

        let local = (offset % logical_block_size as u64) as usize;
        if local + 38 > combined.len() {
            return (entries, false);
        }
        let fid = FileIdentifierDescriptor::read(&combined[local..]);
        if let Some(entry) = fid_to_entry(&fid) {
            entries.push(entry);
        }
        offset += fid.aligned_size() as u64;
    }
    (entries, true)
}

fn parse_fids(content: &[u8]) -> Vec<DirectoryEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos + 38 <= content.len() {
        let fid = FileIdentifierDescriptor::read(&content[pos..]);
        let size = fid.aligned_size();
        if size == 0 || pos + size > content.len() + 3 {
            break;
        }
        if let Some(entry) = fid_to_entry(&fid) {
            entries.push(entry);
        }
        pos += size;
        if size == 0 {
            break;
        }
    }
    entries
}

fn fid_to_entry(fid: &FileIdentifierDescriptor) -> Option<DirectoryEntry> {
    let skip = FileIdentifierDescriptor::FILE_CHARACTERISTIC_EXISTENCE
        | FileIdentifierDescriptor::FILE_CHARACTERISTIC_DELETED
        | FileIdentifierDescriptor::FILE_CHARACTERISTIC_PARENT;
    if fid.file_characteristics & skip != 0 {
        return None;
    }
    let is_dir = fid.file_characteristics & FileIdentifierDescriptor::FILE_CHARACTERISTIC_DIRECTORY != 0;
    let (name_ok, name) = crate::osta::decode_lossy(&fid.file_identifier.0);
    Some(DirectoryEntry {
        name,
        name_ok,
        entry_type: if is_dir { EntryType::Directory } else { EntryType::File },
        icb: fid.icb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::LbAddr;

    fn fid_bytes(name: &str, characteristics: u8) -> Vec<u8> {
        let mut fid = FileIdentifierDescriptor::default();
        fid.file_characteristics = characteristics;
        fid.file_identifier = crate::descriptors::DynamicDstring::from_str(name);
        fid.length_of_file_identifier = fid.file_identifier.0.len() as u8;
        fid.icb = LongAd::default();
        let unaligned = fid.unaligned_size();
        let mut bytes = vec![0u8; unaligned];
        bytes[0..16].copy_from_slice(&[0; 16]);
        bytes[16..18].copy_from_slice(&fid.file_version_number.to_le_bytes());
        bytes[18] = fid.file_characteristics;
        bytes[19] = fid.length_of_file_identifier;
        bytes[38..38 + fid.file_identifier.0.len()].copy_from_slice(&fid.file_identifier.0);
        let aligned = (unaligned + 3) & !3;
        bytes.resize(aligned, 0);
        bytes
    }

    #[test]
    fn parse_fids_skips_deleted_entries() {
        let mut content = Vec::new();
        content.extend(fid_bytes("VIDEO_TS", FileIdentifierDescriptor::FILE_CHARACTERISTIC_DIRECTORY));
        content.extend(fid_bytes("gone", FileIdentifierDescriptor::FILE_CHARACTERISTIC_DELETED));
        let entries = parse_fids(&content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "VIDEO_TS");
        assert_eq!(entries[0].entry_type, EntryType::Directory);
    }

    #[test]
    fn parse_fids_skips_parent_entry() {
        let mut content = Vec::new();
        content.extend(fid_bytes("", FileIdentifierDescriptor::FILE_CHARACTERISTIC_PARENT));
        content.extend(fid_bytes("VIDEO_TS", FileIdentifierDescriptor::FILE_CHARACTERISTIC_DIRECTORY));
        let entries = parse_fids(&content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "VIDEO_TS");
    }

    #[test]
    fn parse_fids_skips_existence_entry() {
        let mut content = Vec::new();
        content.extend(fid_bytes(".hidden", FileIdentifierDescriptor::FILE_CHARACTERISTIC_EXISTENCE));
        content.extend(fid_bytes("VIDEO_TS", FileIdentifierDescriptor::FILE_CHARACTERISTIC_DIRECTORY));
        let entries = parse_fids(&content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "VIDEO_TS");
    }
}
