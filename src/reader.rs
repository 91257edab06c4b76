//! The crate's entry point: opens a block source, walks the volume
//! structures and file set, and exposes path resolution and directory
//! scanning over the result.

use log::{debug, info};

use crate::block_source::BlockSource;
use crate::cache::BlockCache;
use crate::descriptors::{FileSetDescriptor, LongAd, PartitionDescriptor, PartitionMap};
use crate::directory::{scan_dir, DirectoryEntry};
use crate::error::{Result, UdfError};
use crate::file::File as UdfFile;
use crate::icb::resolve_icb;
use crate::volume::{find_file_set_descriptor, read_anchor, read_volume_structures, sanity_check_root, Partition, VolumeDescriptors};

/// A navigable UDF volume backed by a [`BlockSource`].
pub struct Reader<S: BlockSource> {
    cache: BlockCache<S>,
    volume: VolumeDescriptors,
    file_set: FileSetDescriptor,
    root_partition_reference: u16,
    root_partition: Partition,
    root: UdfFile,
}

impl<S: BlockSource> Reader<S> {
    /// Opens `source` as a UDF volume. `enable_cache` controls whether
    /// logical block reads are served from the rotation cache; disabling
    /// it is mainly useful for tests that want every read to hit the
    /// underlying source.
    pub fn open(source: S, enable_cache: bool) -> Result<Self> {
        let mut cache = BlockCache::new(source, enable_cache);
        let avdp = read_anchor(&mut cache)?;
        let volume = read_volume_structures(&mut cache, &avdp)?;
        debug!(
            "Reader::open: logical_block_size={} partitions={}",
            volume.logical_volume.logical_block_size,
            volume.partitions.len()
        );

        let root_partition_reference = volume
            .partition_maps
            .iter()
            .find_map(|m| match m {
                PartitionMap::Type1 { partition_number, .. } => Some(*partition_number),
                _ => None,
            })
            .ok_or(UdfError::InvalidPartitionMap)?;

        let partition_descriptor = volume
            .partitions
            .get(&root_partition_reference)
            .ok_or(UdfError::InvalidPartitionNumber(root_partition_reference))?;

        let metadata_main_file_location = volume
            .partition_maps
            .iter()
            .find_map(|m| match m {
                PartitionMap::Metadata { main_file_location, .. } => Some(*main_file_location),
                _ => None,
            })
            .unwrap_or(0);

        let (root_partition, file_set) = find_file_set_descriptor(&mut cache, partition_descriptor, metadata_main_file_location)
            .ok_or(UdfError::FileSetNotFound)?;

        let root_icb = &file_set.root_directory_icb;
        let root = resolve_icb(&mut cache, &root_partition, root_icb).ok_or(UdfError::RootSanityCheckFailed)?;

        if !sanity_check_root(
            &volume.partitions,
            root_icb.extent_location.partition_reference_number,
            root_icb.extent_location.logical_block_number,
            root.icb_tag.file_type,
        ) {
            return Err(UdfError::RootSanityCheckFailed);
        }

        info!(
            "Reader::open: volume \"{}\" opened",
            volume.primary_volume.volume_identifier.to_string()
        );

        Ok(Self {
            cache,
            volume,
            file_set,
            root_partition_reference,
            root_partition,
            root,
        })
    }

    pub fn volume_identifier(&self) -> String {
        self.volume.primary_volume.volume_identifier.to_string()
    }

    pub fn volume_set_identifier(&self) -> String {
        self.volume.primary_volume.volume_set_identifier.to_string()
    }

    pub fn logical_block_size(&self) -> u32 {
        self.volume.logical_volume.logical_block_size
    }

    /// Lists the entries of a directory. Returns `(entries, complete)`,
    /// where `complete = false` indicates a read underrun partway through
    /// the scan — the entries gathered up to that point are still valid.
    pub fn scan_dir(&mut self, dir: &UdfFile) -> (Vec<DirectoryEntry>, bool) {
        scan_dir(&mut self.cache, self.root_partition.fsd_location, self.logical_block_size(), dir)
    }

    fn resolve(&mut self, icb: &LongAd) -> Option<UdfFile> {
        resolve_icb(&mut self.cache, &self.root_partition, icb)
    }

    /// Resolves a `/`-delimited, case-insensitive path starting from the
    /// root directory. Returns `None` if any path component is missing —
    /// this is a lookup miss, not an error.
    pub fn find_file(&mut self, path: &str) -> Option<UdfFile> {
        let mut current = self.root.clone();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let (entries, _complete) = self.scan_dir(&current);
            let entry = entries.iter().find(|e| e.name.eq_ignore_ascii_case(component))?;
            current = self.resolve(&entry.icb)?;
        }
        Some(current)
    }

    /// Releases any reader-held association with `file`. Provided for
    /// API parity with the reference reader's explicit handle lifecycle;
    /// under Rust ownership a `File` is simply dropped, so this is a
    /// deliberate no-op.
    pub fn free_file(&mut self, _file: UdfFile) {}

    pub fn root(&self) -> &UdfFile {
        &self.root
    }

    pub fn root_partition_reference(&self) -> u16 {
        self.root_partition_reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{
        tag, AnchorVolumeDescriptorPointer, DescriptorTag, LbAddr, LogicalVolumeDescriptor,
        PartitionMapHeader, PrimaryVolumeDescriptor, TerminatingDescriptor,
    };
    use std::io::Cursor;

    const BS: usize = crate::LOGICAL_BLOCK_SIZE;

    fn build_minimal_volume() -> Vec<u8> {
        let mut data = vec![0u8; BS * 600];

        let mut avdp = AnchorVolumeDescriptorPointer::default();
        avdp.tag.tag_identifier = tag::ANCHOR;
        avdp.main_volume_descriptor_sequence_location.location_sector = 257;
        avdp.main_volume_descriptor_sequence_location.length_bytes = BS as u32 * 8;
        let mut buf = vec![0u8; AnchorVolumeDescriptorPointer::SIZE];
        avdp.write(&mut buf);
        data[BS * 256..BS * 256 + buf.len()].copy_from_slice(&buf);

        // Primary Volume Descriptor at sector 257.
        let mut pvd = PrimaryVolumeDescriptor::default();
        pvd.tag.tag_identifier = tag::PRIMARY_VOLUME;
        pvd.volume_identifier = crate::descriptors::Dstring::from_str("TEST_VOLUME");
        write_pvd(&mut data, 257, &pvd);

        // Partition Descriptor at sector 258: partition 0 starts at sector 300.
        let mut pd = PartitionDescriptor::default();
        pd.tag.tag_identifier = tag::PARTITION;
        pd.partition_number = 0;
        pd.partition_starting_location = 300;
        pd.partition_length = 200;
        write_partition(&mut data, 258, &pd);

        // Logical Volume Descriptor at sector 259 with one Type 1 map.
        let mut lvd = LogicalVolumeDescriptor::default();
        lvd.tag.tag_identifier = tag::LOGICAL_VOLUME;
        lvd.logical_block_size = BS as u32;
        lvd.number_of_partition_maps = 1;
        lvd.map_table_length = 6;
        write_lvd(&mut data, 259, &lvd, &Type1PartitionMapBytes { partition_number: 0 });

        // Terminating descriptor at sector 260.
        let mut term = TerminatingDescriptor { tag: Default::default() };
        term.tag.tag_identifier = tag::TERMINATING;
        let start = 260 * BS;
        term.tag.write(&mut data[start..start + 16]);

        // File Set Descriptor at the start of partition 0 (sector 300):
        // root directory ICB points to sector 1 within partition 0.
        let mut fsd = FileSetDescriptor::default();
        fsd.tag.tag_identifier = tag::FILE_SET;
        fsd.root_directory_icb = LongAd {
            extent_length_and_type: 0,
            extent_location: LbAddr {
                logical_block_number: 1,
                partition_reference_number: 0,
            },
            implementation_use: [0; 6],
        };
        write_fsd(&mut data, 300, &fsd);

        // Root directory File Entry at partition-relative sector 1 (absolute 301):
        // embedded allocation descriptors (variant 3), empty content.
        let start = 301 * BS;
        let mut tag_header = DescriptorTag::default();
        tag_header.tag_identifier = tag::FILE_ENTRY;
        tag_header.write(&mut data[start..start + 16]);
        data[start + 16 + 11] = 4; // file_type = Directory
        data[start + 16 + 18..start + 16 + 20].copy_from_slice(&3u16.to_le_bytes()); // ad_variant = embedded
        data[start + 168..start + 172].copy_from_slice(&0u32.to_le_bytes()); // L_EA
        data[start + 172..start + 176].copy_from_slice(&0u32.to_le_bytes()); // L_AD = 0, empty dir

        data
    }

    fn write_pvd(data: &mut [u8], sector: u32, pvd: &PrimaryVolumeDescriptor) {
        let start = sector as usize * BS;
        pvd.tag.write(&mut data[start..start + 16]);
        data[start + 24..start + 56].copy_from_slice(&pvd.volume_identifier.0);
    }

    fn write_partition(data: &mut [u8], sector: u32, pd: &PartitionDescriptor) {
        let start = sector as usize * BS;
        pd.write(&mut data[start..start + PartitionDescriptor::SIZE]);
    }

    struct Type1PartitionMapBytes {
        partition_number: u16,
    }

    fn write_lvd(data: &mut [u8], sector: u32, lvd: &LogicalVolumeDescriptor, map: &Type1PartitionMapBytes) {
        let start = sector as usize * BS;
        lvd.write(&mut data[start..start + LogicalVolumeDescriptor::FIXED_SIZE]);
        let map_start = start + LogicalVolumeDescriptor::FIXED_SIZE;
        let header = PartitionMapHeader {
            partition_map_type: 1,
            partition_map_length: 6,
        };
        data[map_start] = header.partition_map_type;
        data[map_start + 1] = header.partition_map_length;
        data[map_start + 2..map_start + 4].copy_from_slice(&0u16.to_le_bytes());
        data[map_start + 4..map_start + 6].copy_from_slice(&map.partition_number.to_le_bytes());
    }

    fn write_fsd(data: &mut [u8], sector: u32, fsd: &FileSetDescriptor) {
        let start = sector as usize * BS;
        fsd.tag.write(&mut data[start..start + 16]);
        let mut icb_bytes = [0u8; 16];
        fsd.root_directory_icb.write(&mut icb_bytes);
        data[start + 400..start + 416].copy_from_slice(&icb_bytes);
    }

    #[test]
    fn opens_minimal_volume_and_finds_empty_root() {
        let _ = env_logger::try_init();
        let data = build_minimal_volume();
        let cursor = Cursor::new(data);
        let mut reader = Reader::open(cursor, true).expect("volume should open");
        assert_eq!(reader.volume_identifier(), "TEST_VOLUME");
        let (entries, complete) = reader.scan_dir(&reader.root().clone());
        assert!(complete);
        assert!(entries.is_empty());
    }

    #[test]
    fn find_file_misses_on_unknown_path() {
        let data = build_minimal_volume();
        let cursor = Cursor::new(data);
        let mut reader = Reader::open(cursor, true).expect("volume should open");
        assert!(reader.find_file("VIDEO_TS/VIDEO_TS.IFO").is_none());
    }
}
