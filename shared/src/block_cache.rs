//! Per-zoom cache of decoded block-info tiles, kept in step with tile load/unload events.

use std::collections::HashMap;

use crate::blockinfo::{BlockInfo, BlockRecord};
use crate::palette::Palette;
use crate::tile_layer::{TileCoord, TileEvent};

/// A block column looked up under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSample {
    pub record: BlockRecord,
    pub y: i32,
}

/// What the block-info readout shows for one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub x: i32,
    pub z: i32,
    pub block: String,
    pub biome: String,
    pub y: Option<i32>,
}

impl Inspection {
    pub fn new(x: i32, z: i32, sample: Option<BlockSample>, blocks: &Palette, biomes: &Palette) -> Self {
        match sample {
            Some(sample) => Self {
                x,
                z,
                block: blocks.pretty_name(sample.record.block_id),
                biome: biomes.pretty_name(sample.record.biome_id),
                y: (!sample.record.is_unknown()).then_some(sample.y),
            },
            None => Self {
                x,
                z,
                block: crate::palette::UNKNOWN.to_string(),
                biome: crate::palette::UNKNOWN.to_string(),
                y: None,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct BlockInfoCache {
    visible_zoom: Option<u32>,
    /// Tile layers attached at each `(url_zoom, tile)`. Both layers of a double layer count.
    attached: HashMap<(u32, TileCoord), u32>,
    levels: HashMap<u32, HashMap<String, BlockInfo>>,
}

impl BlockInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn visible_zoom(&self) -> Option<u32> {
        self.visible_zoom
    }

    /// Feed tile events through. Returns the tiles whose block info should be fetched.
    pub fn apply(&mut self, events: &[TileEvent]) -> Vec<(u32, TileCoord)> {
        let mut fetch = Vec::new();
        for event in events {
            match *event {
                TileEvent::Load { coord, url_zoom } => {
                    self.attach(url_zoom, coord);
                    fetch.push((url_zoom, coord));
                }
                TileEvent::Unload { coord, url_zoom } => self.detach(url_zoom, coord),
                TileEvent::ZoomChanged { to, .. } => self.set_zoom(to),
                TileEvent::AllLoaded => {}
            }
        }
        fetch.sort();
        fetch.dedup();
        fetch
    }

    pub fn attach(&mut self, url_zoom: u32, coord: TileCoord) {
        *self.attached.entry((url_zoom, coord)).or_insert(0) += 1;
    }

    /// Once no layer holds the tile any more its entry is dropped.
    pub fn detach(&mut self, url_zoom: u32, coord: TileCoord) {
        let Some(count) = self.attached.get_mut(&(url_zoom, coord)) else {
            return;
        };
        *count -= 1;
        if *count > 0 {
            return;
        }
        self.attached.remove(&(url_zoom, coord));
        if let Some(level) = self.levels.get_mut(&url_zoom) {
            level.remove(&coord.key());
        }
    }

    /// Switch the visible zoom; every other level is cleared.
    pub fn set_zoom(&mut self, url_zoom: u32) {
        if self.visible_zoom == Some(url_zoom) {
            return;
        }
        self.visible_zoom = Some(url_zoom);
        self.levels.retain(|zoom, _| *zoom == url_zoom);
        self.attached.retain(|(zoom, _), _| *zoom == url_zoom);
    }

    /// Store a fetched buffer. Dropped when the tile unloaded while the fetch was in flight.
    pub fn insert(&mut self, url_zoom: u32, coord: TileCoord, info: BlockInfo) -> bool {
        if !self.attached.contains_key(&(url_zoom, coord)) {
            return false;
        }
        self.levels
            .entry(url_zoom)
            .or_default()
            .insert(coord.key(), info);
        true
    }

    #[cfg(test)]
    pub fn len_at(&self, url_zoom: u32) -> usize {
        self.levels.get(&url_zoom).map_or(0, HashMap::len)
    }

    /// Block column at `(x, z)` from the visible zoom's tiles.
    pub fn get_block_info(&self, x: i32, z: i32) -> Option<BlockSample> {
        let zoom = self.visible_zoom?;
        let info = self
            .levels
            .get(&zoom)?
            .get(&TileCoord::containing(x, z, zoom).key())?;
        if crate::blockinfo::local_index(x, z, zoom) >= info.len() {
            return None;
        }
        let record = info.record_at(x, z, zoom);
        Some(BlockSample {
            record,
            y: record.y(info.min_y()),
        })
    }

    pub fn clear(&mut self) {
        self.visible_zoom = None;
        self.attached.clear();
        self.levels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockInfoCache, Inspection};
    use crate::blockinfo::tests::buffer;
    use crate::blockinfo::{BlockInfo, BlockRecord};
    use crate::palette::Palette;
    use crate::tile_layer::{TileCoord, TileEvent};

    fn info(records: &[u32]) -> BlockInfo {
        BlockInfo::from_bytes(buffer((0, 0), -64, records)).unwrap()
    }

    fn record(block_id: u16, biome_id: u16, y_offset: u16) -> u32 {
        BlockRecord {
            block_id,
            biome_id,
            y_offset,
        }
        .pack()
    }

    #[test]
    fn load_events_request_fetches_and_unload_evicts() {
        let mut cache = BlockInfoCache::new();
        let tile = TileCoord::new(0, 0);
        let fetch = cache.apply(&[
            TileEvent::ZoomChanged { from: None, to: 0 },
            TileEvent::Load { coord: tile, url_zoom: 0 },
        ]);
        assert_eq!(fetch, vec![(0, tile)]);
        assert!(cache.insert(0, tile, info(&[record(1, 2, 70)])));
        assert_eq!(cache.len_at(0), 1);

        cache.apply(&[TileEvent::Unload { coord: tile, url_zoom: 0 }]);
        assert_eq!(cache.len_at(0), 0);
        assert!(!cache.insert(0, tile, info(&[])));
    }

    #[test]
    fn entry_survives_while_another_layer_holds_the_tile() {
        let mut cache = BlockInfoCache::new();
        let tile = TileCoord::new(2, -1);
        cache.set_zoom(1);
        cache.attach(1, tile);
        cache.attach(1, tile);
        cache.insert(1, tile, info(&[]));
        cache.detach(1, tile);
        assert_eq!(cache.len_at(1), 1);
        cache.detach(1, tile);
        assert_eq!(cache.len_at(1), 0);
    }

    #[test]
    fn zoom_change_clears_old_level_only() {
        let mut cache = BlockInfoCache::new();
        cache.set_zoom(2);
        for x in 0..3 {
            cache.attach(2, TileCoord::new(x, 0));
            cache.insert(2, TileCoord::new(x, 0), info(&[]));
        }
        cache.attach(3, TileCoord::new(0, 0));
        cache.insert(3, TileCoord::new(0, 0), info(&[]));
        assert_eq!(cache.len_at(2), 3);

        cache.set_zoom(3);
        assert_eq!(cache.len_at(2), 0);
        assert_eq!(cache.len_at(3), 1);
        assert!(!cache.insert(2, TileCoord::new(0, 0), info(&[])));
    }

    #[test]
    fn lookup_uses_visible_zoom_tile_and_index() {
        let mut cache = BlockInfoCache::new();
        cache.set_zoom(0);
        let tile = TileCoord::new(-1, 0);
        cache.attach(0, tile);
        let mut records = vec![0u32; 4];
        // block (-511, 0) sits at column 1 of tile (-1, 0)
        records[1] = record(5, 3, 128);
        cache.insert(0, tile, info(&records));

        let sample = cache.get_block_info(-511, 0).unwrap();
        assert_eq!(sample.record.block_id, 5);
        assert_eq!(sample.record.biome_id, 3);
        assert_eq!(sample.y, 64);
        assert!(cache.get_block_info(10, 10).is_none());
        assert!(cache.get_block_info(-1, 500).is_none());
    }

    #[test]
    fn inspection_names_block_and_biome() {
        let blocks =
            Palette::from_bytes(br#"{"5":"minecraft:oak_planks"}"#.to_vec()).unwrap();
        let biomes = Palette::from_bytes(br#"{"3":"minecraft:plains"}"#.to_vec()).unwrap();
        let mut cache = BlockInfoCache::new();
        cache.set_zoom(0);
        cache.attach(0, TileCoord::new(0, 0));
        cache.insert(0, TileCoord::new(0, 0), info(&[record(5, 3, 80)]));

        let found = Inspection::new(0, 0, cache.get_block_info(0, 0), &blocks, &biomes);
        assert_eq!(found.block, "oak planks");
        assert_eq!(found.biome, "plains");
        assert_eq!(found.y, Some(16));

        let missing = Inspection::new(900, 900, cache.get_block_info(900, 900), &blocks, &biomes);
        assert_eq!(missing.block, "unknown");
        assert_eq!(missing.y, None);
    }
}
