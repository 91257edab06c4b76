//! Stateless decoders for on-disc little-endian UDF/ECMA-167 records.
//! All multi-byte integers are little-endian; offsets below are relative
//! to the start of each record's byte slice.

use std::fmt::Debug;

use static_assertions::assert_eq_size;

use crate::osta;

/// A fixed-length UDF "dstring" field padded with trailing zero bytes.
#[derive(Clone)]
pub struct Dstring<const N: usize>(pub [u8; N]);
impl<const N: usize> Dstring<N> {
    pub fn from_str(s: &str) -> Self {
        let v = osta::encode(s);
        let mut x = [0; N];
        let min = v.len().min(N);
        x[..min].copy_from_slice(&v[..min]);
        Self(x)
    }
    pub fn to_string(&self) -> String {
        osta::decode(&self.0)
    }
}
impl<const N: usize> Default for Dstring<N> {
    fn default() -> Self {
        Self([0; N])
    }
}
impl<const N: usize> Debug for Dstring<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string())
    }
}

/// A variable-length dstring, as used in File Identifier Descriptors.
#[derive(Clone, PartialEq, Default)]
pub struct DynamicDstring(pub Vec<u8>);
impl DynamicDstring {
    pub fn from_str(s: &str) -> Self {
        Self(osta::encode(s))
    }
    pub fn to_string(&self) -> String {
        osta::decode(&self.0)
    }
}
impl Debug for DynamicDstring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string())
    }
}

/// UDF 2.1.2 OSTA CS0 Charspec.
#[derive(Clone, PartialEq)]
pub struct CharSpec {
    pub character_set_type: u8,
    pub character_set_info: [u8; 63],
}
impl Default for CharSpec {
    fn default() -> Self {
        Self {
            character_set_type: 0,
            character_set_info: [0; 63],
        }
    }
}
impl Debug for CharSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharSpec")
            .field("character_set_type", &self.character_set_type)
            .finish()
    }
}
impl CharSpec {
    pub const SIZE: usize = 64;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.character_set_type = bytes[0];
        r.character_set_info.copy_from_slice(&bytes[1..64]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0] = self.character_set_type;
        bytes[1..64].copy_from_slice(&self.character_set_info);
    }
}

/// UDF 2.1.4 Timestamp aka ISO 13346 1/7.3.
#[derive(Default, Clone, PartialEq)]
pub struct Timestamp {
    pub type_and_timezone: u16,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centiseconds: u8,
    pub hundreds_of_microseconds: u8,
    pub microseconds: u8,
}
assert_eq_size!(Timestamp, [u8; 12]);
impl Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
impl Timestamp {
    pub const SIZE: usize = 12;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            type_and_timezone: u16::from_le_bytes([bytes[0], bytes[1]]),
            year: u16::from_le_bytes([bytes[2], bytes[3]]),
            month: bytes[4],
            day: bytes[5],
            hour: bytes[6],
            minute: bytes[7],
            second: bytes[8],
            centiseconds: bytes[9],
            hundreds_of_microseconds: bytes[10],
            microseconds: bytes[11],
        }
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..2].copy_from_slice(&self.type_and_timezone.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.year.to_le_bytes());
        bytes[4] = self.month;
        bytes[5] = self.day;
        bytes[6] = self.hour;
        bytes[7] = self.minute;
        bytes[8] = self.second;
        bytes[9] = self.centiseconds;
        bytes[10] = self.hundreds_of_microseconds;
        bytes[11] = self.microseconds;
    }
}

/// ECMA-167 1/7.4 Entity Identifier.
#[derive(Clone, PartialEq)]
pub struct EntityID {
    pub flags: u8,
    pub identifier: [u8; 23],
    pub identifier_suffix: [u8; 8],
}
impl Default for EntityID {
    fn default() -> Self {
        Self {
            flags: 0,
            identifier: [0; 23],
            identifier_suffix: [0; 8],
        }
    }
}
impl Debug for EntityID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self.identifier.iter().position(|&b| b == 0).unwrap_or(23);
        f.debug_struct("EntityID")
            .field("identifier", &String::from_utf8_lossy(&self.identifier[..end]))
            .finish()
    }
}
impl EntityID {
    pub const SIZE: usize = 32;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.flags = bytes[0];
        r.identifier.copy_from_slice(&bytes[1..24]);
        r.identifier_suffix.copy_from_slice(&bytes[24..32]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0] = self.flags;
        bytes[1..24].copy_from_slice(&self.identifier);
        bytes[24..32].copy_from_slice(&self.identifier_suffix);
    }
}

/// The 16-byte header present at the start of every tagged descriptor.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DescriptorTag {
    pub tag_identifier: u16,
    pub descriptor_version: u16,
    pub tag_checksum: u8,
    pub reserved: u8,
    pub tag_serial_number: u16,
    pub descriptor_crc: u16,
    pub descriptor_crc_length: u16,
    pub tag_location: u32,
}
assert_eq_size!(DescriptorTag, [u8; 16]);

pub mod tag {
    pub const PRIMARY_VOLUME: u16 = 1;
    pub const ANCHOR: u16 = 2;
    pub const VOLUME: u16 = 3;
    pub const IMPL_USE: u16 = 4;
    pub const PARTITION: u16 = 5;
    pub const LOGICAL_VOLUME: u16 = 6;
    pub const UNALLOCATED_SPACE: u16 = 7;
    pub const TERMINATING: u16 = 8;
    pub const LOGVOL_INTEGRITY: u16 = 9;
    pub const FILE_SET: u16 = 256;
    pub const FILE_IDENTIFIER: u16 = 257;
    pub const ALLOC_EXTENT: u16 = 258;
    pub const ICB_TERMINAL: u16 = 260;
    pub const FILE_ENTRY: u16 = 261;
    pub const EXT_ATTR_HEADER: u16 = 262;
    pub const UNALLOC_SPACE_ENTRY: u16 = 263;
    pub const SPACE_BITMAP: u16 = 264;
    pub const PARTITION_INTEGRITY: u16 = 265;
    pub const EXTENDED_FILE_ENTRY: u16 = 266;
    pub const INDIRECT_ENTRY: u16 = 259;
}

impl DescriptorTag {
    pub const SIZE: usize = 16;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            tag_identifier: u16::from_le_bytes([bytes[0], bytes[1]]),
            descriptor_version: u16::from_le_bytes([bytes[2], bytes[3]]),
            tag_checksum: bytes[4],
            reserved: bytes[5],
            tag_serial_number: u16::from_le_bytes([bytes[6], bytes[7]]),
            descriptor_crc: u16::from_le_bytes([bytes[8], bytes[9]]),
            descriptor_crc_length: u16::from_le_bytes([bytes[10], bytes[11]]),
            tag_location: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..2].copy_from_slice(&self.tag_identifier.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.descriptor_version.to_le_bytes());
        bytes[4] = self.tag_checksum;
        bytes[5] = self.reserved;
        bytes[6..8].copy_from_slice(&self.tag_serial_number.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.descriptor_crc.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.descriptor_crc_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.tag_location.to_le_bytes());
    }
}

/// Computes the tag checksum: sum modulo 256 of bytes 0-3 and 5-15 of the
/// descriptor's own 16-byte tag.
pub fn tag_checksum(tag_bytes: &[u8; 16]) -> u8 {
    tag_bytes[0..4]
        .iter()
        .chain(&tag_bytes[5..16])
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Validates a descriptor's tag checksum and, if present, its CRC-16 over
/// the bytes following the tag. `full_descriptor` must contain at least
/// `DescriptorTag::SIZE + descriptor_crc_length` bytes.
pub fn validate_descriptor_tag(tag: &DescriptorTag, full_descriptor: &[u8]) -> bool {
    let mut tag_bytes = [0u8; 16];
    tag_bytes.copy_from_slice(&full_descriptor[0..16]);
    if tag.tag_checksum != tag_checksum(&tag_bytes) {
        return false;
    }
    let start = DescriptorTag::SIZE;
    let end = (start + tag.descriptor_crc_length as usize).min(full_descriptor.len());
    if tag.descriptor_crc_length > 0 {
        let checked = &full_descriptor[start..end];
        if crate::crc::cksum(checked) != tag.descriptor_crc {
            return false;
        }
    }
    true
}

/// ECMA-167 7.1 Extent Descriptor.
#[derive(Default, Debug, Clone, Copy)]
pub struct ExtentAd {
    pub length_bytes: u32,
    pub location_sector: u32,
}
impl ExtentAd {
    pub const SIZE: usize = 8;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            length_bytes: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            location_sector: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.length_bytes.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.location_sector.to_le_bytes());
    }
}

/// UDF Anchor Volume Descriptor Pointer, ISO 13346 3/10.2.
#[derive(Debug, Clone)]
pub struct AnchorVolumeDescriptorPointer {
    pub tag: DescriptorTag,
    pub main_volume_descriptor_sequence_location: ExtentAd,
    pub reserve_volume_descriptor_sequence_location: ExtentAd,
    pub reserved: [u8; 480],
}
impl Default for AnchorVolumeDescriptorPointer {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            main_volume_descriptor_sequence_location: Default::default(),
            reserve_volume_descriptor_sequence_location: Default::default(),
            reserved: [0; 480],
        }
    }
}
impl AnchorVolumeDescriptorPointer {
    pub const SIZE: usize = 512;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.main_volume_descriptor_sequence_location = ExtentAd::read(&bytes[16..24]);
        r.reserve_volume_descriptor_sequence_location = ExtentAd::read(&bytes[24..32]);
        r.reserved.copy_from_slice(&bytes[32..512]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        self.tag.write(&mut bytes[0..16]);
        self.main_volume_descriptor_sequence_location.write(&mut bytes[16..24]);
        self.reserve_volume_descriptor_sequence_location.write(&mut bytes[24..32]);
        bytes[32..512].copy_from_slice(&self.reserved);
    }
}

/// ECMA-167 7.1 Recorded address aka `lb_addr`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct LbAddr {
    pub logical_block_number: u32,
    pub partition_reference_number: u16,
}
impl LbAddr {
    pub const SIZE: usize = 6;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            logical_block_number: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            partition_reference_number: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.logical_block_number.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.partition_reference_number.to_le_bytes());
    }
}

/// ECMA-167 4/14.14.2 Long Allocation Descriptor aka `long_ad`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct LongAd {
    pub extent_length_and_type: u32,
    pub extent_location: LbAddr,
    pub implementation_use: [u8; 6],
}
impl LongAd {
    pub const SIZE: usize = 16;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.extent_length_and_type = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        r.extent_location = LbAddr::read(&bytes[4..10]);
        r.implementation_use.copy_from_slice(&bytes[10..16]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.extent_length_and_type.to_le_bytes());
        self.extent_location.write(&mut bytes[4..10]);
        bytes[10..16].copy_from_slice(&self.implementation_use);
    }
    pub fn extent_length_bytes(&self) -> u32 {
        self.extent_length_and_type & 0x3FFF_FFFF
    }
}

/// ECMA-167 4/14.14.1 Short Allocation Descriptor aka `short_ad`. Used for
/// allocation descriptors within the file's own partition, with no
/// partition reference field of its own.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct ShortAllocationDescriptorRaw {
    pub extent_length_and_type: u32,
    pub extent_location: u32,
}
impl ShortAllocationDescriptorRaw {
    pub const SIZE: usize = 8;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            extent_length_and_type: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            extent_location: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
    pub fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.extent_length_and_type.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.extent_location.to_le_bytes());
    }
    pub fn extent_length_bytes(&self) -> u32 {
        self.extent_length_and_type & 0x3FFF_FFFF
    }
    pub fn extent_type(&self) -> u8 {
        (self.extent_length_and_type >> 30) as u8
    }
}

/// Generic partition-map header: type byte + length byte.
#[derive(Default, Debug, Clone, Copy)]
pub struct PartitionMapHeader {
    pub partition_map_type: u8,
    pub partition_map_length: u8,
}

/// UDF 2.2.8 partition maps. Type 1 is a direct physical partition; Type 2
/// indirects through either a Metadata Partition or a Sparable Partition,
/// identified by the 23-byte identifier string at offset 5.
#[derive(Debug, Clone)]
pub enum PartitionMap {
    Type1 {
        header: PartitionMapHeader,
        volume_sequence_number: u16,
        partition_number: u16,
    },
    Metadata {
        header: PartitionMapHeader,
        identifier: [u8; 23],
        main_file_location: u32,
        mirror_file_location: u32,
        bitmap_file_location: u32,
        allocation_unit_size: u32,
        alignment_unit_size: u16,
        flags: u8,
    },
    Sparable {
        header: PartitionMapHeader,
        identifier: [u8; 23],
        volume_sequence_number: u16,
        partition_number: u16,
        packet_length: u16,
        num_sparing_tables: u8,
        sparing_table_size: u32,
        sparing_table_locations: Vec<u32>,
    },
    Other {
        header: PartitionMapHeader,
        data: Vec<u8>,
    },
}

const METADATA_PARTITION_IDENTIFIER: &[u8] = b"*UDF Metadata Partition";
const SPARABLE_PARTITION_IDENTIFIER: &[u8] = b"*UDF Sparable Partition";

impl PartitionMap {
    pub fn read(bytes: &[u8]) -> crate::error::Result<Self> {
        if bytes.len() < 2 {
            return Err(crate::error::UdfError::BufferTooSmall);
        }
        let map_type = bytes[0];
        let map_length = bytes[1];
        if bytes.len() < map_length as usize {
            return Err(crate::error::UdfError::BufferTooSmall);
        }
        let header = PartitionMapHeader {
            partition_map_type: map_type,
            partition_map_length: map_length,
        };
        match map_type {
            1 => {
                if map_length != 6 {
                    return Err(crate::error::UdfError::InvalidPartitionMap);
                }
                Ok(PartitionMap::Type1 {
                    header,
                    volume_sequence_number: u16::from_le_bytes([bytes[2], bytes[3]]),
                    partition_number: u16::from_le_bytes([bytes[4], bytes[5]]),
                })
            }
            2 => {
                let mut identifier = [0u8; 23];
                identifier.copy_from_slice(&bytes[5..28]);
                if identifier == metadata_partition_identifier_fixed() {
                    Ok(PartitionMap::Metadata {
                        header,
                        identifier,
                        main_file_location: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
                        mirror_file_location: u32::from_le_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]),
                        bitmap_file_location: u32::from_le_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]),
                        allocation_unit_size: u32::from_le_bytes([bytes[52], bytes[53], bytes[54], bytes[55]]),
                        alignment_unit_size: u16::from_le_bytes([bytes[56], bytes[57]]),
                        flags: bytes[58],
                    })
                } else if identifier == sparable_partition_identifier_fixed() {
                    let num_sparing_tables = bytes[42];
                    let mut sparing_table_locations = Vec::with_capacity(num_sparing_tables as usize);
                    for i in 0..num_sparing_tables as usize {
                        let off = 48 + i * 4;
                        if off + 4 > bytes.len() {
                            break;
                        }
                        sparing_table_locations.push(u32::from_le_bytes([
                            bytes[off],
                            bytes[off + 1],
                            bytes[off + 2],
                            bytes[off + 3],
                        ]));
                    }
                    Ok(PartitionMap::Sparable {
                        header,
                        identifier,
                        volume_sequence_number: u16::from_le_bytes([bytes[36], bytes[37]]),
                        partition_number: u16::from_le_bytes([bytes[38], bytes[39]]),
                        packet_length: u16::from_le_bytes([bytes[40], bytes[41]]),
                        num_sparing_tables,
                        sparing_table_size: u32::from_le_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]),
                        sparing_table_locations,
                    })
                } else {
                    Ok(PartitionMap::Other {
                        header,
                        data: bytes[..map_length as usize].to_vec(),
                    })
                }
            }
            _ => Ok(PartitionMap::Other {
                header,
                data: bytes[..map_length as usize].to_vec(),
            }),
        }
    }

    pub fn get_length(&self) -> u8 {
        match self {
            PartitionMap::Type1 { .. } => 6,
            PartitionMap::Metadata { header, .. }
            | PartitionMap::Sparable { header, .. }
            | PartitionMap::Other { header, .. } => header.partition_map_length,
        }
    }
}

fn metadata_partition_identifier_fixed() -> [u8; 23] {
    let mut out = [0u8; 23];
    out[..METADATA_PARTITION_IDENTIFIER.len()].copy_from_slice(METADATA_PARTITION_IDENTIFIER);
    out
}
fn sparable_partition_identifier_fixed() -> [u8; 23] {
    let mut out = [0u8; 23];
    out[..SPARABLE_PARTITION_IDENTIFIER.len()].copy_from_slice(SPARABLE_PARTITION_IDENTIFIER);
    out
}

/// UDF Logical Volume Descriptor, ISO 13346 3/10.6. Fixed portion is 440
/// bytes; the partition map table follows immediately after.
#[derive(Clone, Debug)]
pub struct LogicalVolumeDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: u32,
    pub descriptor_character_set: CharSpec,
    pub logical_volume_identifier: Dstring<128>,
    pub logical_block_size: u32,
    pub domain_identifier: EntityID,
    pub logical_volume_contents_use: [u8; 16],
    pub map_table_length: u32,
    pub number_of_partition_maps: u32,
    pub implementation_identifier: EntityID,
    pub implementation_use: [u8; 128],
    pub integrity_sequence_extent: ExtentAd,
}
impl Default for LogicalVolumeDescriptor {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            volume_descriptor_sequence_number: 0,
            descriptor_character_set: Default::default(),
            logical_volume_identifier: Dstring::default(),
            logical_block_size: 0,
            domain_identifier: Default::default(),
            logical_volume_contents_use: [0; 16],
            map_table_length: 0,
            number_of_partition_maps: 0,
            implementation_identifier: Default::default(),
            implementation_use: [0; 128],
            integrity_sequence_extent: Default::default(),
        }
    }
}
impl LogicalVolumeDescriptor {
    pub const FIXED_SIZE: usize = 440;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.volume_descriptor_sequence_number = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        r.descriptor_character_set = CharSpec::read(&bytes[20..84]);
        r.logical_volume_identifier.0.copy_from_slice(&bytes[84..212]);
        r.logical_block_size = u32::from_le_bytes([bytes[212], bytes[213], bytes[214], bytes[215]]);
        r.domain_identifier = EntityID::read(&bytes[216..248]);
        r.logical_volume_contents_use.copy_from_slice(&bytes[248..264]);
        r.map_table_length = u32::from_le_bytes([bytes[264], bytes[265], bytes[266], bytes[267]]);
        r.number_of_partition_maps = u32::from_le_bytes([bytes[268], bytes[269], bytes[270], bytes[271]]);
        r.implementation_identifier = EntityID::read(&bytes[272..304]);
        r.implementation_use.copy_from_slice(&bytes[304..432]);
        r.integrity_sequence_extent = ExtentAd::read(&bytes[432..440]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        self.tag.write(&mut bytes[0..16]);
        bytes[16..20].copy_from_slice(&self.volume_descriptor_sequence_number.to_le_bytes());
        self.descriptor_character_set.write(&mut bytes[20..84]);
        bytes[84..212].copy_from_slice(&self.logical_volume_identifier.0);
        bytes[212..216].copy_from_slice(&self.logical_block_size.to_le_bytes());
        self.domain_identifier.write(&mut bytes[216..248]);
        bytes[248..264].copy_from_slice(&self.logical_volume_contents_use);
        bytes[264..268].copy_from_slice(&self.map_table_length.to_le_bytes());
        bytes[268..272].copy_from_slice(&self.number_of_partition_maps.to_le_bytes());
        self.implementation_identifier.write(&mut bytes[272..304]);
        bytes[304..432].copy_from_slice(&self.implementation_use);
        self.integrity_sequence_extent.write(&mut bytes[432..440]);
    }
}

/// UDF 2.2.14 / ECMA-167 3/10.5 Partition Descriptor.
#[derive(Debug, Clone)]
pub struct PartitionDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: u32,
    pub partition_flags: u16,
    pub partition_number: u16,
    pub partition_contents: EntityID,
    pub partition_contents_use: [u8; 128],
    pub access_type: u32,
    pub partition_starting_location: u32,
    pub partition_length: u32,
    pub implementation_identifier: EntityID,
    pub implementation_use: [u8; 128],
}
impl Default for PartitionDescriptor {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            volume_descriptor_sequence_number: 0,
            partition_flags: 0,
            partition_number: 0,
            partition_contents: Default::default(),
            partition_contents_use: [0; 128],
            access_type: 0,
            partition_starting_location: 0,
            partition_length: 0,
            implementation_identifier: Default::default(),
            implementation_use: [0; 128],
        }
    }
}
impl PartitionDescriptor {
    pub const SIZE: usize = 512;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.volume_descriptor_sequence_number = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        r.partition_flags = u16::from_le_bytes([bytes[20], bytes[21]]);
        r.partition_number = u16::from_le_bytes([bytes[22], bytes[23]]);
        r.partition_contents = EntityID::read(&bytes[24..56]);
        r.partition_contents_use.copy_from_slice(&bytes[56..184]);
        r.access_type = u32::from_le_bytes([bytes[184], bytes[185], bytes[186], bytes[187]]);
        r.partition_starting_location = u32::from_le_bytes([bytes[188], bytes[189], bytes[190], bytes[191]]);
        r.partition_length = u32::from_le_bytes([bytes[192], bytes[193], bytes[194], bytes[195]]);
        r.implementation_identifier = EntityID::read(&bytes[196..228]);
        r.implementation_use.copy_from_slice(&bytes[228..356]);
        r
    }
    pub fn write(&self, bytes: &mut [u8]) {
        self.tag.write(&mut bytes[0..16]);
        bytes[16..20].copy_from_slice(&self.volume_descriptor_sequence_number.to_le_bytes());
        bytes[20..22].copy_from_slice(&self.partition_flags.to_le_bytes());
        bytes[22..24].copy_from_slice(&self.partition_number.to_le_bytes());
        self.partition_contents.write(&mut bytes[24..56]);
        bytes[56..184].copy_from_slice(&self.partition_contents_use);
        bytes[184..188].copy_from_slice(&self.access_type.to_le_bytes());
        bytes[188..192].copy_from_slice(&self.partition_starting_location.to_le_bytes());
        bytes[192..196].copy_from_slice(&self.partition_length.to_le_bytes());
        self.implementation_identifier.write(&mut bytes[196..228]);
        bytes[228..356].copy_from_slice(&self.implementation_use);
    }
}

/// UDF 2.3.2 File Set Descriptor, ECMA-167 4/14.1.
#[derive(Debug, Clone)]
pub struct FileSetDescriptor {
    pub tag: DescriptorTag,
    pub recording_date_and_time: Timestamp,
    pub file_set_number: u32,
    pub file_set_descriptor_number: u32,
    pub logical_volume_identifier: Dstring<128>,
    pub file_set_identifier: Dstring<32>,
    pub root_directory_icb: LongAd,
}
impl Default for FileSetDescriptor {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            recording_date_and_time: Default::default(),
            file_set_number: 0,
            file_set_descriptor_number: 0,
            logical_volume_identifier: Dstring::default(),
            file_set_identifier: Dstring::default(),
            root_directory_icb: Default::default(),
        }
    }
}
impl FileSetDescriptor {
    pub const SIZE: usize = 512;
    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.recording_date_and_time = Timestamp::read(&bytes[16..28]);
        r.file_set_number = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
        r.file_set_descriptor_number = u32::from_le_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]);
        r.logical_volume_identifier.0.copy_from_slice(&bytes[112..240]);
        r.file_set_identifier.0.copy_from_slice(&bytes[304..336]);
        r.root_directory_icb = LongAd::read(&bytes[400..416]);
        r
    }
}

#[derive(Debug, Clone)]
pub struct TerminatingDescriptor {
    pub tag: DescriptorTag,
}
impl TerminatingDescriptor {
    pub const SIZE: usize = 512;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            tag: DescriptorTag::read(&bytes[0..16]),
        }
    }
}

/// UDF 2.2.2 Primary Volume Descriptor.
#[derive(Clone, Debug)]
pub struct PrimaryVolumeDescriptor {
    pub tag: DescriptorTag,
    pub volume_identifier: Dstring<32>,
    pub volume_set_identifier: Dstring<128>,
    pub recording_date_and_time: Timestamp,
    pub application_identifier: EntityID,
}
impl Default for PrimaryVolumeDescriptor {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            volume_identifier: Dstring::default(),
            volume_set_identifier: Dstring::default(),
            recording_date_and_time: Default::default(),
            application_identifier: Default::default(),
        }
    }
}
impl PrimaryVolumeDescriptor {
    pub const SIZE: usize = 512;
    /// Offset and length of the volume identifier field, per the
    /// Volume-identifier extractor contract.
    pub const VOLUME_IDENTIFIER_OFFSET: usize = 24;
    pub const VOLUME_IDENTIFIER_LENGTH: usize = 32;
    pub const VOLUME_SET_IDENTIFIER_OFFSET: usize = 72;
    pub const VOLUME_SET_IDENTIFIER_LENGTH: usize = 128;

    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.volume_identifier.0.copy_from_slice(&bytes[24..56]);
        r.volume_set_identifier.0.copy_from_slice(&bytes[72..200]);
        r.application_identifier = EntityID::read(&bytes[344..376]);
        r.recording_date_and_time = Timestamp::read(&bytes[376..388]);
        r
    }
}

/// Space Bitmap Descriptor (tag 264). Decoded for diagnostics only — the
/// Open() sequence does not retain it beyond logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceBitmapDescriptor {
    pub number_of_bits: u32,
    pub number_of_bytes: u32,
}
impl SpaceBitmapDescriptor {
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            number_of_bits: u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            number_of_bytes: u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
        }
    }
}

/// ECMA-167 4/14.6 ICB Tag. `flags` bottom 3 bits select the allocation
/// descriptor variant; `file_type` distinguishes directory/regular/etc.
#[derive(Default, Debug, Clone)]
pub struct ICBTag {
    pub prior_recorded_number_of_direct_entries: u32,
    pub strategy_type: u16,
    pub maximum_number_of_entries: u16,
    pub file_type: u8,
    pub parent_icb_location: LbAddr,
    pub flags: u16,
}
impl ICBTag {
    pub const SIZE: usize = 20;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            prior_recorded_number_of_direct_entries: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            strategy_type: u16::from_le_bytes([bytes[4], bytes[5]]),
            maximum_number_of_entries: u16::from_le_bytes([bytes[8], bytes[9]]),
            file_type: bytes[11],
            parent_icb_location: LbAddr::read(&bytes[12..18]),
            flags: u16::from_le_bytes([bytes[18], bytes[19]]),
        }
    }
    /// Bottom 3 bits of flags: 0=Short, 1=Long, 2=Extended, 3=embedded.
    pub fn ad_variant(&self) -> u8 {
        (self.flags & 0b111) as u8
    }
    pub fn file_type(&self) -> FileType {
        FileType::from(self.file_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unspecified,
    Unallocated,
    PartitionIntegrity,
    Indirect,
    Directory,
    SequenceOfBytes,
    BlockSpecialDevice,
    CharacterSpecialDevice,
    ExtendedAttributes,
    Fifo,
    Socket,
    TerminalEntry,
    SymbolicLink,
    StreamDirectory,
    Reserved,
    Agreement,
}
impl From<u8> for FileType {
    fn from(v: u8) -> FileType {
        match v {
            0 => FileType::Unspecified,
            1 => FileType::Unallocated,
            2 => FileType::PartitionIntegrity,
            3 => FileType::Indirect,
            4 => FileType::Directory,
            5 => FileType::SequenceOfBytes,
            6 => FileType::BlockSpecialDevice,
            7 => FileType::CharacterSpecialDevice,
            8 => FileType::ExtendedAttributes,
            9 => FileType::Fifo,
            10 => FileType::Socket,
            11 => FileType::TerminalEntry,
            12 => FileType::SymbolicLink,
            13 => FileType::StreamDirectory,
            14..=247 => FileType::Reserved,
            _ => FileType::Agreement,
        }
    }
}

/// UDF 2.3.4 File Identifier Descriptor, ECMA-167 4/14.4.
#[derive(Debug, Clone, PartialEq)]
pub struct FileIdentifierDescriptor {
    pub tag: DescriptorTag,
    pub file_version_number: u16,
    pub file_characteristics: u8,
    pub length_of_file_identifier: u8,
    pub icb: LongAd,
    pub length_of_implementation_use: u16,
    pub implementation_use: Vec<u8>,
    pub file_identifier: DynamicDstring,
}
impl Default for FileIdentifierDescriptor {
    fn default() -> Self {
        Self {
            tag: Default::default(),
            file_version_number: 0,
            file_characteristics: 0,
            length_of_file_identifier: 0,
            icb: Default::default(),
            length_of_implementation_use: 0,
            implementation_use: Vec::new(),
            file_identifier: DynamicDstring::default(),
        }
    }
}
impl FileIdentifierDescriptor {
    pub const FILE_CHARACTERISTIC_EXISTENCE: u8 = 0b0000_0001;
    pub const FILE_CHARACTERISTIC_DIRECTORY: u8 = 0b0000_0010;
    pub const FILE_CHARACTERISTIC_DELETED: u8 = 0b0000_0100;
    pub const FILE_CHARACTERISTIC_PARENT: u8 = 0b0000_1000;
    pub const FILE_CHARACTERISTIC_METADATA: u8 = 0b0001_0000;

    /// Size in bytes before 4-byte alignment.
    pub fn unaligned_size(&self) -> usize {
        38 + self.length_of_implementation_use as usize + self.length_of_file_identifier as usize
    }
    /// Size in bytes after rounding up to a multiple of 4, as the directory
    /// iterator must when advancing its byte pointer.
    pub fn aligned_size(&self) -> usize {
        (self.unaligned_size() + 3) & !3
    }

    pub fn read(bytes: &[u8]) -> Self {
        let mut r = Self::default();
        r.tag = DescriptorTag::read(&bytes[0..16]);
        r.file_version_number = u16::from_le_bytes([bytes[16], bytes[17]]);
        r.file_characteristics = bytes[18];
        r.length_of_file_identifier = bytes[19];
        r.icb = LongAd::read(&bytes[20..36]);
        r.length_of_implementation_use = u16::from_le_bytes([bytes[36], bytes[37]]);
        let impl_use_len = r.length_of_implementation_use as usize;
        let file_id_len = r.length_of_file_identifier as usize;
        r.implementation_use = bytes[38..38 + impl_use_len].to_vec();
        r.file_identifier = DynamicDstring(bytes[38 + impl_use_len..38 + impl_use_len + file_id_len].to_vec());
        r
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerminalEntry {
    pub tag: DescriptorTag,
    pub icb_tag: ICBTag,
}
impl TerminalEntry {
    pub const SIZE: usize = 36;
}

/// ECMA-167 4/14.7 Indirect Entry: points to another ICB to follow.
#[derive(Debug, Clone, Default)]
pub struct IndirectEntry {
    pub tag: DescriptorTag,
    pub icb_tag: ICBTag,
    pub indirect_icb: LongAd,
}
impl IndirectEntry {
    pub const SIZE: usize = 52;
    pub fn read(bytes: &[u8]) -> Self {
        Self {
            tag: DescriptorTag::read(&bytes[0..16]),
            icb_tag: ICBTag::read(&bytes[16..36]),
            indirect_icb: LongAd::read(&bytes[36..52]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_tag_round_trips() {
        let mut bytes = [0u8; 16];
        let tag = DescriptorTag {
            tag_identifier: 5,
            descriptor_version: 2,
            tag_checksum: 0,
            reserved: 0,
            tag_serial_number: 1,
            descriptor_crc: 0,
            descriptor_crc_length: 0,
            tag_location: 42,
        };
        tag.write(&mut bytes);
        assert_eq!(DescriptorTag::read(&bytes), tag);
    }

    #[test]
    fn type1_partition_map_decodes() {
        let bytes = [1u8, 6, 1, 0, 3, 0];
        match PartitionMap::read(&bytes).unwrap() {
            PartitionMap::Type1 { partition_number, .. } => assert_eq!(partition_number, 3),
            _ => panic!("expected Type1"),
        }
    }

    #[test]
    fn metadata_partition_map_decodes() {
        let mut bytes = [0u8; 64];
        bytes[0] = 2;
        bytes[1] = 64;
        bytes[5..28].copy_from_slice(&metadata_partition_identifier_fixed());
        bytes[40..44].copy_from_slice(&700u32.to_le_bytes());
        match PartitionMap::read(&bytes).unwrap() {
            PartitionMap::Metadata { main_file_location, .. } => assert_eq!(main_file_location, 700),
            _ => panic!("expected Metadata"),
        }
    }

    #[test]
    fn file_identifier_aligns_to_4_bytes() {
        let fid = FileIdentifierDescriptor {
            length_of_file_identifier: 1,
            ..Default::default()
        };
        assert_eq!(fid.unaligned_size(), 39);
        assert_eq!(fid.aligned_size(), 40);
    }
}
