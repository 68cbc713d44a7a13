use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::GzDecoder;

use crate::error::DecodeError;

/// Header words: region x, region z, min y.
pub const HEADER_BYTES: usize = 12;
/// Block columns per tile edge.
pub const TILE_BLOCKS: i32 = 512;

const BLOCK_ID_SHIFT: u32 = 22;
const BIOME_ID_SHIFT: u32 = 12;
const TEN_BITS: u32 = 0x3FF;
const Y_MASK: u32 = 0xFFF;

/// One packed block column: `block:10 | biome:10 | y:12`, high bits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRecord {
    pub block_id: u16,
    pub biome_id: u16,
    /// Height above the world's `min_y`.
    pub y_offset: u16,
}

impl BlockRecord {
    pub const MAX_ID: u16 = TEN_BITS as u16;
    pub const MAX_Y_OFFSET: u16 = Y_MASK as u16;

    pub const fn unpack(packed: u32) -> Self {
        Self {
            block_id: ((packed >> BLOCK_ID_SHIFT) & TEN_BITS) as u16,
            biome_id: ((packed >> BIOME_ID_SHIFT) & TEN_BITS) as u16,
            y_offset: (packed & Y_MASK) as u16,
        }
    }

    pub fn pack(&self) -> u32 {
        debug_assert!(self.block_id <= Self::MAX_ID);
        debug_assert!(self.biome_id <= Self::MAX_ID);
        debug_assert!(self.y_offset <= Self::MAX_Y_OFFSET);
        ((self.block_id as u32 & TEN_BITS) << BLOCK_ID_SHIFT)
            | ((self.biome_id as u32 & TEN_BITS) << BIOME_ID_SHIFT)
            | (self.y_offset as u32 & Y_MASK)
    }

    /// Absolute height.
    pub fn y(&self, min_y: i32) -> i32 {
        min_y + self.y_offset as i32
    }

    /// Id 0 is "no data" in both palettes.
    pub fn is_unknown(&self) -> bool {
        self.block_id == 0 && self.biome_id == 0
    }
}

/// The block-info sidecar of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    data: Vec<u8>,
}

impl BlockInfo {
    /// Accepts the buffer already inflated by the browser or still gzip-framed.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let data = maybe_gunzip(bytes)?;
        if data.len() < HEADER_BYTES {
            return Err(DecodeError::Truncated {
                len: data.len(),
                needed: HEADER_BYTES,
            });
        }
        Ok(Self { data })
    }

    /// Third header word; the first two (region x and z) only restate the tile address.
    pub fn min_y(&self) -> i32 {
        LittleEndian::read_i32(&self.data[8..12])
    }

    /// Number of whole records after the header.
    pub fn len(&self) -> usize {
        (self.data.len() - HEADER_BYTES) / 4
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record at `index`, read from byte `HEADER_BYTES + index * 4`. Panics when out of range.
    pub fn record(&self, index: usize) -> BlockRecord {
        let offset = HEADER_BYTES + index * 4;
        BlockRecord::unpack(LittleEndian::read_u32(&self.data[offset..offset + 4]))
    }

    /// Record for block `(x, z)` in a tile fetched at `url_zoom`.
    pub fn record_at(&self, x: i32, z: i32, url_zoom: u32) -> BlockRecord {
        self.record(local_index(x, z, url_zoom))
    }
}

/// Side of one tile in blocks at `url_zoom`.
pub fn tile_span(url_zoom: u32) -> f64 {
    f64::from(TILE_BLOCKS) * 2f64.powi(url_zoom.min(i32::MAX as u32) as i32)
}

/// Arithmetic shift that saturates to the sign once every bit is shifted out.
fn shr(value: i32, shift: u32) -> i32 {
    value.checked_shr(shift).unwrap_or(if value < 0 { -1 } else { 0 })
}

/// Index inside a tile's grid; each entry spans `2^url_zoom` blocks.
pub fn local_index(x: i32, z: i32, url_zoom: u32) -> usize {
    let lx = shr(x, url_zoom) & (TILE_BLOCKS - 1);
    let lz = shr(z, url_zoom) & (TILE_BLOCKS - 1);
    (lz * TILE_BLOCKS + lx) as usize
}

/// Tile coordinate containing block `(x, z)` at `url_zoom`.
pub fn tile_of(x: i32, z: i32, url_zoom: u32) -> (i32, i32) {
    let shift = url_zoom.saturating_add(9);
    (shr(x, shift), shr(z, shift))
}

pub(crate) fn maybe_gunzip(bytes: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
    if bytes.len() < 2 || bytes[0] != 0x1f || bytes[1] != 0x8b {
        return Ok(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use byteorder::{ByteOrder, LittleEndian};
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::{BlockInfo, BlockRecord, HEADER_BYTES, local_index, tile_of, tile_span};
    use crate::error::DecodeError;

    /// Builds a raw buffer with the given header and records.
    pub(crate) fn buffer(region: (i32, i32), min_y: i32, records: &[u32]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_BYTES + records.len() * 4];
        LittleEndian::write_i32(&mut data[0..4], region.0);
        LittleEndian::write_i32(&mut data[4..8], region.1);
        LittleEndian::write_i32(&mut data[8..12], min_y);
        for (i, word) in records.iter().enumerate() {
            let offset = HEADER_BYTES + i * 4;
            LittleEndian::write_u32(&mut data[offset..offset + 4], *word);
        }
        data
    }

    pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn record_round_trips_across_field_ranges() {
        let ids = [0u16, 1, 2, 511, 512, 1022, BlockRecord::MAX_ID];
        let ys = [0u16, 1, 63, 64, 2048, 4094, BlockRecord::MAX_Y_OFFSET];
        for block_id in ids {
            for biome_id in ids {
                for y_offset in ys {
                    let record = BlockRecord {
                        block_id,
                        biome_id,
                        y_offset,
                    };
                    assert_eq!(BlockRecord::unpack(record.pack()), record);
                }
            }
        }
    }

    #[test]
    fn fields_occupy_documented_bits() {
        let record = BlockRecord::unpack(0xFFC0_0000);
        assert_eq!(record.block_id, 1023);
        assert_eq!(record.biome_id, 0);
        let record = BlockRecord::unpack(0x003F_F000);
        assert_eq!(record.biome_id, 1023);
        assert_eq!(record.y_offset, 0);
        assert_eq!(BlockRecord::unpack(0x0000_0FFF).y_offset, 4095);
    }

    #[test]
    fn absolute_height_adds_min_y() {
        let record = BlockRecord {
            block_id: 1,
            biome_id: 1,
            y_offset: 70,
        };
        assert_eq!(record.y(-64), 6);
        assert_eq!(record.y(0), 70);
    }

    #[test]
    fn reads_header_and_records_at_explicit_offsets() {
        let stone = BlockRecord {
            block_id: 5,
            biome_id: 3,
            y_offset: 128,
        };
        let water = BlockRecord {
            block_id: 9,
            biome_id: 40,
            y_offset: 62,
        };
        let info =
            BlockInfo::from_bytes(buffer((-1, 2), -64, &[stone.pack(), water.pack()])).unwrap();
        assert_eq!(info.min_y(), -64);
        assert_eq!(info.len(), 2);
        assert_eq!(info.record(0), stone);
        assert_eq!(info.record(1), water);
    }

    #[test]
    fn accepts_gzip_framed_buffers() {
        let record = BlockRecord {
            block_id: 7,
            biome_id: 2,
            y_offset: 10,
        };
        let raw = buffer((0, 0), 0, &[record.pack()]);
        let info = BlockInfo::from_bytes(gzip(&raw)).unwrap();
        assert_eq!(info.record(0), record);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = BlockInfo::from_bytes(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { len: 3, .. }));
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_panics() {
        let info = BlockInfo::from_bytes(buffer((0, 0), 0, &[0])).unwrap();
        let _ = info.record(1);
    }

    #[test]
    fn local_index_wraps_negative_coordinates() {
        assert_eq!(local_index(0, 0, 0), 0);
        assert_eq!(local_index(1, 0, 0), 1);
        assert_eq!(local_index(0, 1, 0), 512);
        assert_eq!(local_index(-1, -1, 0), 511 * 512 + 511);
        assert_eq!(local_index(3, 5, 1), 2 * 512 + 1);
    }

    #[test]
    fn tile_of_scales_with_url_zoom() {
        assert_eq!(tile_of(0, 0, 0), (0, 0));
        assert_eq!(tile_of(511, 512, 0), (0, 1));
        assert_eq!(tile_of(-1, -513, 0), (-1, -2));
        assert_eq!(tile_of(1023, 1024, 1), (0, 1));
    }

    #[test]
    fn deepest_zoom_shifts_stay_in_range() {
        assert_eq!(tile_span(0), 512.0);
        assert_eq!(tile_span(22), 2f64.powi(31));
        assert_eq!(tile_of(i32::MAX, i32::MIN, 22), (0, -1));
        assert_eq!(tile_of(-1, 1, 40), (-1, 0));
        assert_eq!(local_index(i32::MIN, -1, 40), 511 * 512 + 511);
    }
}
