//! File Entry / Extended File Entry decoding and the allocation descriptor
//! chain they carry, plus the file-offset-to-block-address translator.

use log::warn;

use crate::descriptors::{tag, DescriptorTag, ICBTag, LbAddr, LongAd, ShortAllocationDescriptorRaw};
use crate::error::{Result, UdfError};

/// Upper bound on the number of allocation descriptors resolved for a
/// single file, mirroring the original reader's fixed-size `AD` array.
pub const UDF_MAX_AD_CHAINS: usize = 50;

/// A 20-byte Extended Allocation Descriptor (ECMA-167 4/14.14.3), used by
/// Extended File Entries. Not present in short/long form: a third length
/// field (`information_length`) sits between `recorded_length` and the
/// extent location, which short/long ADs don't carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedAd {
    pub extent_length: u32,
    pub recorded_length: u32,
    pub information_length: u32,
    pub extent_location: LbAddr,
    pub implementation_use: [u8; 2],
}
impl ExtendedAd {
    pub const SIZE: usize = 20;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            extent_length: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            recorded_length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            information_length: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            extent_location: LbAddr::read(&bytes[12..18]),
            implementation_use: [bytes[18], bytes[19]],
        }
    }
}

/// A normalized allocation descriptor, unifying the short/long/extended
/// on-disc variants used by the block-address translator.
#[derive(Debug, Clone, Copy)]
pub struct AllocationDescriptor {
    pub extent_length_bytes: u32,
    pub extent_type: u8,
    pub partition_reference_number: u16,
    pub logical_block_number: u32,
}

/// A decoded File Entry or Extended File Entry: enough to navigate the
/// file's data extents and, for directories, to scan its contents.
#[derive(Debug, Clone)]
pub struct File {
    pub tag: DescriptorTag,
    pub icb_tag: ICBTag,
    pub information_length: u64,
    /// Set when the ICB's allocation descriptor variant is "embedded":
    /// the file's content is stored directly in the ICB rather than in
    /// extents elsewhere on the volume.
    pub embedded_content: Option<Vec<u8>>,
    pub allocation_descriptors: Vec<AllocationDescriptor>,
}

fn short_ad_from_raw(raw: &ShortAllocationDescriptorRaw, own_partition: u16) -> AllocationDescriptor {
    AllocationDescriptor {
        extent_length_bytes: raw.extent_length_bytes(),
        extent_type: raw.extent_type(),
        partition_reference_number: own_partition,
        logical_block_number: raw.extent_location,
    }
}

fn long_ad_to_allocation_descriptor(ad: &LongAd) -> AllocationDescriptor {
    AllocationDescriptor {
        extent_length_bytes: ad.extent_length_bytes(),
        extent_type: ((ad.extent_length_and_type >> 30) & 0b11) as u8,
        partition_reference_number: ad.extent_location.partition_reference_number,
        logical_block_number: ad.extent_location.logical_block_number,
    }
}

fn extended_ad_to_allocation_descriptor(ad: &ExtendedAd) -> AllocationDescriptor {
    AllocationDescriptor {
        extent_length_bytes: ad.extent_length & 0x3FFF_FFFF,
        extent_type: ((ad.extent_length >> 30) & 0b11) as u8,
        partition_reference_number: ad.extent_location.partition_reference_number,
        logical_block_number: ad.extent_location.logical_block_number,
    }
}

/// Decodes the 176-byte-fixed-header File Entry (tag 261) starting at the
/// given bytes, dispatching on `icb_tag.ad_variant()` to parse the
/// allocation descriptor table that follows the extended attributes.
pub fn read_file_entry(bytes: &[u8], own_partition: u16) -> Result<File> {
    let tag_header = DescriptorTag::read(&bytes[0..16]);
    if tag_header.tag_identifier != tag::FILE_ENTRY {
        return Err(UdfError::InvalidDescriptorTag {
            expected: tag::FILE_ENTRY,
            found: tag_header.tag_identifier,
        });
    }
    let icb_tag = ICBTag::read(&bytes[16..36]);
    let information_length = u64::from_le_bytes(bytes[56..64].try_into().unwrap());
    let l_ea = u32::from_le_bytes(bytes[168..172].try_into().unwrap()) as usize;
    let l_ad = u32::from_le_bytes(bytes[172..176].try_into().unwrap()) as usize;
    let ad_start = 176 + l_ea;
    let ad_end = ad_start.checked_add(l_ad).filter(|&e| e <= 2048 && e <= bytes.len());
    let ad_end = ad_end.ok_or(UdfError::BufferTooSmall)?;
    let ad_bytes = &bytes[ad_start..ad_end];
    decode_body(tag_header, icb_tag, information_length, ad_bytes, own_partition, true)
}

/// Decodes an Extended File Entry (tag 266); the fixed header is 216 bytes
/// rather than 176, and lengths are wider, but the allocation descriptor
/// table is the same shape.
pub fn read_extended_file_entry(bytes: &[u8], own_partition: u16) -> Result<File> {
    let tag_header = DescriptorTag::read(&bytes[0..16]);
    if tag_header.tag_identifier != tag::EXTENDED_FILE_ENTRY {
        return Err(UdfError::InvalidDescriptorTag {
            expected: tag::EXTENDED_FILE_ENTRY,
            found: tag_header.tag_identifier,
        });
    }
    let icb_tag = ICBTag::read(&bytes[16..36]);
    let information_length = u64::from_le_bytes(bytes[56..64].try_into().unwrap());
    let l_ea = u32::from_le_bytes(bytes[208..212].try_into().unwrap()) as usize;
    let l_ad = u32::from_le_bytes(bytes[212..216].try_into().unwrap()) as usize;
    let ad_start = 216 + l_ea;
    let ad_end = ad_start.checked_add(l_ad).filter(|&e| e <= 2048 && e <= bytes.len());
    let ad_end = ad_end.ok_or(UdfError::BufferTooSmall)?;
    let ad_bytes = &bytes[ad_start..ad_end];
    decode_body(tag_header, icb_tag, information_length, ad_bytes, own_partition, false)
}

/// Shared tail of `read_file_entry`/`read_extended_file_entry`: dispatches
/// on `icb_tag.ad_variant()` to decode the allocation descriptor table.
/// `override_length_on_embed` is true only for the non-extended File
/// Entry: when the ICB embeds its content directly (variant 3), ECMA-167
/// 14.6.8 has the non-extended form override `Length` to `L_AD`, but
/// `dvd_udf.c`'s `UDFExtFileEntry` leaves this commented out for the
/// Extended File Entry, keeping the header's `information_length` as-is.
fn decode_body(
    tag_header: DescriptorTag,
    icb_tag: ICBTag,
    information_length: u64,
    ad_bytes: &[u8],
    own_partition: u16,
    override_length_on_embed: bool,
) -> Result<File> {
    match icb_tag.ad_variant() {
        0 => {
            let mut ads = Vec::new();
            for chunk in ad_bytes.chunks_exact(8) {
                if ads.len() >= UDF_MAX_AD_CHAINS {
                    return Err(UdfError::AdChainCapacityExceeded);
                }
                let raw = ShortAllocationDescriptorRaw::read(chunk);
                ads.push(short_ad_from_raw(&raw, own_partition));
            }
            Ok(File {
                tag: tag_header,
                icb_tag,
                information_length,
                embedded_content: None,
                allocation_descriptors: ads,
            })
        }
        1 => {
            let mut ads = Vec::new();
            for chunk in ad_bytes.chunks_exact(16) {
                if ads.len() >= UDF_MAX_AD_CHAINS {
                    return Err(UdfError::AdChainCapacityExceeded);
                }
                ads.push(long_ad_to_allocation_descriptor(&LongAd::read(chunk)));
            }
            Ok(File {
                tag: tag_header,
                icb_tag,
                information_length,
                embedded_content: None,
                allocation_descriptors: ads,
            })
        }
        2 => {
            let mut ads = Vec::new();
            for chunk in ad_bytes.chunks_exact(20) {
                if ads.len() >= UDF_MAX_AD_CHAINS {
                    return Err(UdfError::AdChainCapacityExceeded);
                }
                ads.push(extended_ad_to_allocation_descriptor(&ExtendedAd::read(chunk)));
            }
            Ok(File {
                tag: tag_header,
                icb_tag,
                information_length,
                embedded_content: None,
                allocation_descriptors: ads,
            })
        }
        3 => {
            let information_length = if override_length_on_embed {
                ad_bytes.len() as u64
            } else {
                information_length
            };
            Ok(File {
                tag: tag_header,
                icb_tag,
                information_length,
                embedded_content: Some(ad_bytes.to_vec()),
                allocation_descriptors: Vec::new(),
            })
        }
        other => {
            warn!("decode_body: unrecognized allocation descriptor variant {}", other);
            Err(UdfError::InvalidPartitionMap)
        }
    }
}

/// Resolves a byte offset within a file's data to the allocation
/// descriptor it falls in, and the block offset into that descriptor's
/// extent. Returns `None` only when the chain itself is empty.
///
/// Reproduces the reference reader's block translator, which never
/// advances the cumulative offset between allocation descriptors: the
/// offset is checked against each descriptor's length in turn but is not
/// reduced by the descriptors skipped over, so a file whose content spans
/// more than one extent resolves incorrectly past the first. Enable the
/// `corrected-ad-chain` feature to subtract each skipped extent's length
/// before checking the next.
///
/// When the offset runs past every extent in the chain without matching,
/// this falls back to the chain's first descriptor rather than failing —
/// `dvd_udf.c`'s `UDFFileBlockRaw` does the same
/// (`if (i >= File->num_AD) i = 0;`), backward-compatible with readers
/// that treat a file as one contiguous run regardless of its real chain.
fn ad_relative_block(ads: &[AllocationDescriptor], logical_block_size: u32, offset_bytes: u64) -> Option<u32> {
    let mut remaining = offset_bytes;
    let mut chosen = 0;
    for (i, ad) in ads.iter().enumerate() {
        if remaining < ad.extent_length_bytes as u64 {
            chosen = i;
            break;
        }
        #[cfg(feature = "corrected-ad-chain")]
        {
            remaining -= ad.extent_length_bytes as u64;
        }
    }
    let ad = ads.get(chosen).or_else(|| ads.first())?;
    Some(ad.logical_block_number + (remaining / logical_block_size as u64) as u32)
}

/// Translates a file-relative byte offset into an absolute logical block
/// number for ordinary file content, adding the owning partition's
/// physical starting location (`partition.Start`).
pub fn block_for_file(ads: &[AllocationDescriptor], partition_start: u32, logical_block_size: u32, offset_bytes: u64) -> Option<u32> {
    ad_relative_block(ads, logical_block_size, offset_bytes).map(|b| b + partition_start)
}

/// Translates a file-relative byte offset into an absolute logical block
/// number for directory content, adding the File Set Descriptor's
/// location (`partition.fsd_location`) rather than the partition's
/// physical start — directories are addressed relative to the FSD under
/// UDF 2.50+ metadata-partition indirection, where the two differ.
pub fn block_for_dir(ads: &[AllocationDescriptor], fsd_location: u32, logical_block_size: u32, offset_bytes: u64) -> Option<u32> {
    ad_relative_block(ads, logical_block_size, offset_bytes).map(|b| b + fsd_location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::tag as tagid;

    const PARTITION_START: u32 = 1000;

    #[test]
    fn block_for_file_resolves_within_first_extent() {
        let ads = vec![AllocationDescriptor {
            extent_length_bytes: 4096,
            extent_type: 0,
            partition_reference_number: 0,
            logical_block_number: 10,
        }];
        assert_eq!(block_for_file(&ads, PARTITION_START, 2048, 2048), Some(1011));
    }

    #[test]
    fn block_for_dir_adds_fsd_location_not_partition_start() {
        let ads = vec![AllocationDescriptor {
            extent_length_bytes: 4096,
            extent_type: 0,
            partition_reference_number: 0,
            logical_block_number: 10,
        }];
        let fsd_location = 5000;
        assert_eq!(block_for_dir(&ads, fsd_location, 2048, 2048), Some(5011));
    }

    #[test]
    fn block_for_file_without_feature_misresolves_second_extent() {
        let ads = vec![
            AllocationDescriptor {
                extent_length_bytes: 2048,
                extent_type: 0,
                partition_reference_number: 0,
                logical_block_number: 10,
            },
            AllocationDescriptor {
                extent_length_bytes: 4096,
                extent_type: 0,
                partition_reference_number: 0,
                logical_block_number: 20,
            },
        ];
        // offset 3000 falls in the second extent logically, but since the
        // first extent's length is never subtracted, it is checked against
        // extent 1 (3000 >= 2048, skip), then extent 2 (3000 < 4096, hit)
        // using the un-adjusted offset.
        let block = block_for_file(&ads, PARTITION_START, 2048, 3000).unwrap();
        assert_eq!(block, PARTITION_START + 20 + (3000 / 2048) as u32);
    }

    #[test]
    fn block_for_file_falls_back_to_first_descriptor_past_chain_end() {
        let ads = vec![AllocationDescriptor {
            extent_length_bytes: 2048,
            extent_type: 0,
            partition_reference_number: 0,
            logical_block_number: 10,
        }];
        // offset 4096 matches no extent in the (single-entry) chain; rather
        // than failing, this defaults back to AD[0].
        let block = block_for_file(&ads, PARTITION_START, 2048, 4096).unwrap();
        assert_eq!(block, PARTITION_START + 10 + 2);
    }

    #[test]
    fn block_for_file_on_empty_chain_returns_none() {
        assert_eq!(block_for_file(&[], PARTITION_START, 2048, 0), None);
    }

    #[test]
    fn read_file_entry_rejects_wrong_tag() {
        let mut bytes = vec![0u8; 200];
        bytes[0..2].copy_from_slice(&tagid::FILE_IDENTIFIER.to_le_bytes());
        assert!(read_file_entry(&bytes, 0).is_err());
    }

    #[test]
    fn read_file_entry_rejects_oversized_ad_table() {
        let mut bytes = vec![0u8; 2048];
        bytes[0..2].copy_from_slice(&tagid::FILE_ENTRY.to_le_bytes());
        bytes[168..172].copy_from_slice(&0u32.to_le_bytes()); // L_EA
        bytes[172..176].copy_from_slice(&2000u32.to_le_bytes()); // L_AD: 176+2000 > 2048
        assert!(matches!(read_file_entry(&bytes, 0), Err(UdfError::BufferTooSmall)));
    }

    #[test]
    fn extended_ad_reads_information_length_and_location_at_correct_offsets() {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&1u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&3u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&7u32.to_le_bytes());
        bytes[16..18].copy_from_slice(&9u16.to_le_bytes());
        let ad = ExtendedAd::read(&bytes);
        assert_eq!(ad.extent_length, 1);
        assert_eq!(ad.recorded_length, 2);
        assert_eq!(ad.information_length, 3);
        assert_eq!(ad.extent_location.logical_block_number, 7);
        assert_eq!(ad.extent_location.partition_reference_number, 9);
    }
}
