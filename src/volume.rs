//! Anchor location, Volume Descriptor Sequence walk, and File Set
//! Descriptor discovery — the "Open()" path that turns a raw block source
//! into a navigable volume.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::block_source::BlockSource;
use crate::cache::BlockCache;
use crate::descriptors::{
    tag, AnchorVolumeDescriptorPointer, DescriptorTag, FileSetDescriptor, LogicalVolumeDescriptor,
    PartitionDescriptor, PartitionMap, PrimaryVolumeDescriptor, SpaceBitmapDescriptor, TerminatingDescriptor,
};
use crate::error::{Result, UdfError};
use crate::file::{read_extended_file_entry, File as UdfFile};

/// ICB file type values marking the Metadata Main/Mirror/Bitmap Files
/// (UDF 2.50+ metadata-partition indirection), ECMA-167's `file_type`
/// range for implementation-specific use.
const FILETYPE_METADATA_MAIN: u8 = 250;
const FILETYPE_METADATA_MIRROR: u8 = 251;
const FILETYPE_METADATA_BITMAP: u8 = 252;

/// Fixed location of the Anchor Volume Descriptor Pointer for DVD-Video
/// and Blu-ray media. Unlike some UDF readers, this does not fall back to
/// searching near the end of the medium when sector 256 is unreadable —
/// that fallback path in the reference implementation never actually ran
/// (its "last sector" input was never computed), so there is nothing to
/// reproduce here.
pub const ANCHOR_SECTOR: u32 = 256;

pub fn read_anchor<S: BlockSource>(cache: &mut BlockCache<S>) -> Result<AnchorVolumeDescriptorPointer> {
    let block = cache.read_block(ANCHOR_SECTOR).ok_or(UdfError::AnchorNotFound)?;
    let avdp = AnchorVolumeDescriptorPointer::read(&block);
    if avdp.tag.tag_identifier != tag::ANCHOR {
        return Err(UdfError::AnchorNotFound);
    }
    debug!("read_anchor: main={:?} reserve={:?}", avdp.main_volume_descriptor_sequence_location, avdp.reserve_volume_descriptor_sequence_location);
    Ok(avdp)
}

#[derive(Debug, Clone)]
pub struct VolumeDescriptors {
    pub primary_volume: PrimaryVolumeDescriptor,
    pub logical_volume: LogicalVolumeDescriptor,
    pub partition_maps: Vec<PartitionMap>,
    pub partitions: BTreeMap<u16, PartitionDescriptor>,
}

fn read_volume_descriptor_sequence<S: BlockSource>(
    cache: &mut BlockCache<S>,
    start_sector: u32,
    length_bytes: u32,
) -> Option<VolumeDescriptors> {
    let end_sector = start_sector + length_bytes.div_ceil(crate::LOGICAL_BLOCK_SIZE as u32);
    let mut current = start_sector;

    let mut primary_volume = None;
    let mut logical_volume = None;
    let mut partition_maps = None;
    let mut partitions: BTreeMap<u16, PartitionDescriptor> = BTreeMap::new();

    while current < end_sector {
        let block = cache.read_block(current)?;
        let tag_header = DescriptorTag::read(&block[0..16]);
        match tag_header.tag_identifier {
            tag::PRIMARY_VOLUME => {
                primary_volume = Some(PrimaryVolumeDescriptor::read(&block));
            }
            tag::PARTITION => {
                let pd = PartitionDescriptor::read(&block);
                partitions.insert(pd.partition_number, pd);
            }
            tag::LOGICAL_VOLUME => {
                let lvd = LogicalVolumeDescriptor::read(&block);
                let table_start = LogicalVolumeDescriptor::FIXED_SIZE;
                let table_end = table_start + lvd.map_table_length as usize;
                let mut maps = Vec::new();
                let mut offset = table_start;
                while offset < table_end && offset + 2 <= block.len() {
                    let map = match PartitionMap::read(&block[offset..]) {
                        Ok(m) => m,
                        Err(e) => {
                            warn!("read_volume_descriptor_sequence: bad partition map: {}", e);
                            break;
                        }
                    };
                    offset += map.get_length() as usize;
                    maps.push(map);
                }
                let newer = logical_volume
                    .as_ref()
                    .map(|old: &LogicalVolumeDescriptor| lvd.volume_descriptor_sequence_number >= old.volume_descriptor_sequence_number)
                    .unwrap_or(true);
                if newer {
                    logical_volume = Some(lvd);
                    partition_maps = Some(maps);
                }
            }
            tag::TERMINATING => break,
            _ => {}
        }
        current += 1;
    }

    match (primary_volume, logical_volume, partition_maps) {
        (Some(pvd), Some(lvd), Some(maps)) => Some(VolumeDescriptors {
            primary_volume: pvd,
            logical_volume: lvd,
            partition_maps: maps,
            partitions,
        }),
        _ => None,
    }
}

/// Walks the Volume Descriptor Sequence starting from the anchor.
///
/// The reference implementation's partition finder restarts from the Main
/// Volume Descriptor Sequence when the first pass comes back incomplete,
/// rather than falling back to the Reserve sequence as ECMA-167 8.4.2
/// describes — a volume whose MVDS is damaged is never actually rescued
/// by its RVDS. That behavior is preserved here.
// TODO: the second attempt below should read from
// `reserve_volume_descriptor_sequence_location`, not `main_...` again.
pub fn read_volume_structures<S: BlockSource>(
    cache: &mut BlockCache<S>,
    avdp: &AnchorVolumeDescriptorPointer,
) -> Result<VolumeDescriptors> {
    let main = &avdp.main_volume_descriptor_sequence_location;
    if let Some(vs) = read_volume_descriptor_sequence(cache, main.location_sector, main.length_bytes) {
        return Ok(vs);
    }
    debug!("read_volume_structures: main sequence incomplete, restarting main sequence");
    read_volume_descriptor_sequence(cache, main.location_sector, main.length_bytes)
        .ok_or(UdfError::InvalidDescriptorTag {
            expected: tag::LOGICAL_VOLUME,
            found: 0,
        })
}

/// A partition as actually used for ICB resolution and directory-content
/// addressing. `fsd_location` is the absolute block the File Set
/// Descriptor was found at, which becomes the base address `resolve_icb`
/// and `block_for_dir` add to an ICB/allocation-descriptor-relative block
/// number (`dvd_udf.c`'s `partition->fsd_location`). For a plain Type 1
/// partition this equals `descriptor.partition_starting_location`; under
/// UDF 2.50+ metadata-partition indirection it is wherever the scan below
/// actually lands after following the Metadata Main File's own extent.
#[derive(Debug, Clone)]
pub struct Partition {
    pub descriptor: PartitionDescriptor,
    pub fsd_location: u32,
    pub metadata_main_file: Option<UdfFile>,
    pub metadata_mirror_file: Option<UdfFile>,
}

impl Partition {
    pub fn start(&self) -> u32 {
        self.descriptor.partition_starting_location
    }
    pub fn length(&self) -> u32 {
        self.descriptor.partition_length
    }
    pub fn number(&self) -> u16 {
        self.descriptor.partition_number
    }
}

/// Scans forward from `partition.Start + metadata_main_file_location` for
/// the File Set Descriptor, bounded by the partition's length.
/// `metadata_main_file_location` is 0 for a volume with no Metadata
/// Partition map, which makes the scan start at the partition's physical
/// start exactly as a plain Type 1 partition would.
///
/// Along the way, Extended File Entries tagged with file type 250/251/252
/// mark the Metadata Main/Mirror/Bitmap Files (UDF 2.50+ indirection)
/// rather than ordinary content: encountering the Main File redirects the
/// scan to its own first extent before continuing, and the Main/Mirror
/// File entries themselves are retained on the returned `Partition` for
/// callers that need them. This mirrors `UDFOpen`'s scan loop in
/// `dvd_udf.c`, including the `lbnum - 1` fixup for `fsd_location` (the
/// loop's read-then-increment leaves `lbnum` one past the descriptor it
/// just matched).
pub fn find_file_set_descriptor<S: BlockSource>(
    cache: &mut BlockCache<S>,
    partition_descriptor: &PartitionDescriptor,
    metadata_main_file_location: u32,
) -> Option<(Partition, FileSetDescriptor)> {
    let own_partition = partition_descriptor.partition_number;
    let start = partition_descriptor.partition_starting_location;
    let end = start + partition_descriptor.partition_length;
    let mut lbnum = start + metadata_main_file_location;

    let mut metadata_main_file = None;
    let mut metadata_mirror_file = None;

    while lbnum < end {
        let sector = lbnum;
        lbnum += 1;
        let block = match cache.read_block(sector) {
            Some(b) => b,
            None => break,
        };
        let tag_header = DescriptorTag::read(&block[0..16]);
        match tag_header.tag_identifier {
            tag::SPACE_BITMAP => {
                let bitmap = SpaceBitmapDescriptor::read(&block);
                debug!(
                    "find_file_set_descriptor: space bitmap at {} (bits={} bytes={})",
                    sector, bitmap.number_of_bits, bitmap.number_of_bytes
                );
            }
            tag::EXTENDED_FILE_ENTRY => {
                let file = match read_extended_file_entry(&block, own_partition) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("find_file_set_descriptor: bad extended file entry at {}: {}", sector, e);
                        continue;
                    }
                };
                match file.icb_tag.file_type {
                    FILETYPE_METADATA_MAIN => {
                        if let Some(ad) = file.allocation_descriptors.first() {
                            lbnum = start + ad.logical_block_number;
                        }
                        metadata_main_file = Some(file);
                    }
                    FILETYPE_METADATA_MIRROR => {
                        metadata_mirror_file = Some(file);
                    }
                    FILETYPE_METADATA_BITMAP => {}
                    _ => {}
                }
            }
            tag::FILE_SET => {
                let fsd = FileSetDescriptor::read(&block);
                let partition = Partition {
                    descriptor: partition_descriptor.clone(),
                    fsd_location: lbnum - 1,
                    metadata_main_file,
                    metadata_mirror_file,
                };
                return Some((partition, fsd));
            }
            tag::TERMINATING => break,
            _ => {}
        }
    }
    None
}

/// Basic plausibility check on a root directory ICB: its own partition
/// reference must be literally 0 (ECMA-167 requires the root to live in
/// the first partition map entry; `dvd_udf.c`'s `UDFOpen` checks this
/// against the *resolved* root directory's AD chain, not the referenced
/// partition's existence), it must actually resolve to a Directory, and
/// its logical block number must fall within the partition's extent.
pub fn sanity_check_root(
    partitions: &BTreeMap<u16, PartitionDescriptor>,
    partition_reference_number: u16,
    logical_block_number: u32,
    file_type: u8,
) -> bool {
    if partition_reference_number != 0 {
        return false;
    }
    if file_type != 4 {
        return false;
    }
    match partitions.get(&partition_reference_number) {
        Some(pd) => logical_block_number < pd.partition_length,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_block(data: &mut [u8], sector: u32, body: &[u8]) {
        let start = sector as usize * crate::LOGICAL_BLOCK_SIZE;
        data[start..start + body.len()].copy_from_slice(body);
    }

    #[test]
    fn read_anchor_requires_tag_2_at_sector_256() {
        let data = vec![0u8; crate::LOGICAL_BLOCK_SIZE * 300];
        let cursor = Cursor::new(data);
        let mut cache = BlockCache::new(cursor, false);
        assert!(read_anchor(&mut cache).is_err());
    }

    #[test]
    fn read_anchor_reads_valid_pointer() {
        let mut data = vec![0u8; crate::LOGICAL_BLOCK_SIZE * 300];
        let mut avdp = AnchorVolumeDescriptorPointer::default();
        avdp.tag.tag_identifier = tag::ANCHOR;
        avdp.main_volume_descriptor_sequence_location.location_sector = 257;
        avdp.main_volume_descriptor_sequence_location.length_bytes = 2048 * 4;
        let mut buf = vec![0u8; AnchorVolumeDescriptorPointer::SIZE];
        avdp.write(&mut buf);
        write_block(&mut data, ANCHOR_SECTOR, &buf);
        let cursor = Cursor::new(data);
        let mut cache = BlockCache::new(cursor, false);
        let read_back = read_anchor(&mut cache).unwrap();
        assert_eq!(read_back.main_volume_descriptor_sequence_location.location_sector, 257);
    }

    #[test]
    fn sanity_check_root_rejects_unknown_partition() {
        let partitions = BTreeMap::new();
        assert!(!sanity_check_root(&partitions, 0, 0, 4));
    }

    #[test]
    fn sanity_check_root_rejects_out_of_range_block() {
        let mut partitions = BTreeMap::new();
        let mut pd = PartitionDescriptor::default();
        pd.partition_length = 10;
        partitions.insert(0, pd);
        assert!(!sanity_check_root(&partitions, 0, 20, 4));
        assert!(sanity_check_root(&partitions, 0, 5, 4));
    }

    #[test]
    fn sanity_check_root_rejects_nonzero_partition_reference() {
        let mut partitions = BTreeMap::new();
        let mut pd = PartitionDescriptor::default();
        pd.partition_length = 10;
        partitions.insert(1, pd);
        // Partition 1 exists and the block is in range, but the root must
        // literally reference partition 0.
        assert!(!sanity_check_root(&partitions, 1, 5, 4));
    }

    #[test]
    fn sanity_check_root_rejects_non_directory_file_type() {
        let mut partitions = BTreeMap::new();
        let mut pd = PartitionDescriptor::default();
        pd.partition_length = 10;
        partitions.insert(0, pd);
        assert!(!sanity_check_root(&partitions, 0, 5, 5));
    }

    fn write_extended_file_entry(data: &mut [u8], sector: u32, file_type: u8, embedded_location: u32) {
        let start = sector as usize * crate::LOGICAL_BLOCK_SIZE;
        let mut tag_header = DescriptorTag::default();
        tag_header.tag_identifier = tag::EXTENDED_FILE_ENTRY;
        tag_header.write(&mut data[start..start + 16]);
        data[start + 16 + 11] = file_type;
        data[start + 16 + 18..start + 16 + 20].copy_from_slice(&1u16.to_le_bytes()); // ad_variant = long
        data[start + 208..start + 212].copy_from_slice(&0u32.to_le_bytes()); // L_EA
        data[start + 212..start + 216].copy_from_slice(&16u32.to_le_bytes()); // L_AD = one long AD
        let mut ad_bytes = [0u8; 16];
        let ad = crate::descriptors::LongAd {
            extent_length_and_type: crate::LOGICAL_BLOCK_SIZE as u32,
            extent_location: crate::descriptors::LbAddr {
                logical_block_number: embedded_location,
                partition_reference_number: 0,
            },
            implementation_use: [0; 6],
        };
        ad.write(&mut ad_bytes);
        data[start + 216..start + 232].copy_from_slice(&ad_bytes);
    }

    #[test]
    fn find_file_set_descriptor_follows_metadata_main_file_redirect() {
        let mut data = vec![0u8; crate::LOGICAL_BLOCK_SIZE * 400];
        let mut pd = PartitionDescriptor::default();
        pd.partition_number = 0;
        pd.partition_starting_location = 100;
        pd.partition_length = 200;

        // Metadata Main File entry at partition-relative sector 0,
        // redirecting the scan to partition-relative sector 10.
        write_extended_file_entry(&mut data, 100, 250, 10);

        // File Set Descriptor at partition-relative sector 10 (absolute 110).
        let mut fsd = FileSetDescriptor::default();
        fsd.tag.tag_identifier = tag::FILE_SET;
        let start = 110 * crate::LOGICAL_BLOCK_SIZE;
        fsd.tag.write(&mut data[start..start + 16]);

        let cursor = Cursor::new(data);
        let mut cache = BlockCache::new(cursor, false);
        let (partition, found) = find_file_set_descriptor(&mut cache, &pd, 0).expect("file set should be found");
        assert_eq!(found.tag.tag_identifier, tag::FILE_SET);
        assert_eq!(partition.fsd_location, 110);
        assert!(partition.metadata_main_file.is_some());
    }
}
