//! Reversed-zoom tile layer bookkeeping, independent of how tile images are fetched.
//!
//! The layer decides which tiles it needs for a view, hands out [`TileRequest`]s, and reports
//! [`TileEvent`]s (load, unload, zoom change, all loaded) as results come back. `I` is whatever
//! the caller keeps per loaded tile (an image element in the browser, `()` in tests).

use std::collections::HashMap;

use crate::blockinfo::tile_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cache key, `"{x}_{z}"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.x, self.z)
    }

    /// Tile containing block `(x, z)` at `url_zoom`.
    pub fn containing(x: i32, z: i32, url_zoom: u32) -> Self {
        let (tx, tz) = tile_of(x, z, url_zoom);
        Self::new(tx, tz)
    }
}

/// Block-space rectangle, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockBounds {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl BlockBounds {
    /// Tiles at `url_zoom` overlapping these bounds, row by row.
    pub fn tiles(&self, url_zoom: u32) -> Vec<TileCoord> {
        let start = TileCoord::containing(
            self.min_x.floor() as i32,
            self.min_z.floor() as i32,
            url_zoom,
        );
        let end = TileCoord::containing(
            self.max_x.floor() as i32,
            self.max_z.floor() as i32,
            url_zoom,
        );
        let mut tiles = Vec::new();
        for z in start.z..=end.z {
            for x in start.x..=end.x {
                tiles.push(TileCoord::new(x, z));
            }
        }
        tiles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Hidden,
    Loading,
    Visible,
}

/// Ask the caller to fetch one tile image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    /// Which of the two layers of a double layer asked.
    pub slot: usize,
    pub coord: TileCoord,
    pub url_zoom: u32,
    pub generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEvent {
    Load { coord: TileCoord, url_zoom: u32 },
    Unload { coord: TileCoord, url_zoom: u32 },
    ZoomChanged { from: Option<u32>, to: u32 },
    AllLoaded,
}

/// What a view change or redraw wants done.
#[derive(Debug, Default, PartialEq)]
pub struct LayerUpdate {
    pub requests: Vec<TileRequest>,
    pub events: Vec<TileEvent>,
}

impl LayerUpdate {
    pub fn extend(&mut self, other: LayerUpdate) {
        self.requests.extend(other.requests);
        self.events.extend(other.events);
    }
}

#[derive(Debug)]
enum TileSlot<I> {
    Loading,
    Ready(I),
    Failed,
}

#[derive(Debug)]
pub struct TileLayer<I> {
    slot: usize,
    renderer: String,
    z_index: i32,
    state: LayerState,
    url_zoom: Option<u32>,
    generation: u32,
    tiles: HashMap<TileCoord, TileSlot<I>>,
}

impl<I> TileLayer<I> {
    pub fn new(slot: usize, renderer: impl Into<String>, z_index: i32, state: LayerState) -> Self {
        Self {
            slot,
            renderer: renderer.into(),
            z_index,
            state,
            url_zoom: None,
            generation: 0,
            tiles: HashMap::new(),
        }
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    pub const fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: i32) {
        self.z_index = z_index;
    }

    pub const fn state(&self) -> LayerState {
        self.state
    }

    pub fn set_state(&mut self, state: LayerState) {
        self.state = state;
    }

    pub const fn url_zoom(&self) -> Option<u32> {
        self.url_zoom
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.tiles
            .values()
            .any(|slot| matches!(slot, TileSlot::Loading))
    }

    pub fn ready_tiles(&self) -> impl Iterator<Item = (TileCoord, &I)> {
        self.tiles.iter().filter_map(|(coord, slot)| match slot {
            TileSlot::Ready(image) => Some((*coord, image)),
            _ => None,
        })
    }

    /// Follow the view: drop tiles that left it, request the ones that entered it. A different
    /// `url_zoom` unloads everything first and reports the zoom change.
    pub fn set_view(&mut self, url_zoom: u32, wanted: &[TileCoord]) -> LayerUpdate {
        let mut update = LayerUpdate::default();
        if self.url_zoom != Some(url_zoom) {
            update.events.extend(self.unload_all());
            update.events.push(TileEvent::ZoomChanged {
                from: self.url_zoom,
                to: url_zoom,
            });
            self.url_zoom = Some(url_zoom);
        }

        let stale: Vec<TileCoord> = self
            .tiles
            .keys()
            .filter(|coord| !wanted.contains(coord))
            .copied()
            .collect();
        for coord in stale {
            if let Some(TileSlot::Ready(_)) = self.tiles.remove(&coord) {
                update.events.push(TileEvent::Unload { coord, url_zoom });
            }
        }

        for coord in wanted {
            if self.tiles.contains_key(coord) {
                continue;
            }
            self.tiles.insert(*coord, TileSlot::Loading);
            update.requests.push(self.request(*coord, url_zoom));
        }
        update
    }

    /// Throw away every tile and fetch them again under a new generation.
    pub fn redraw(&mut self) -> LayerUpdate {
        let mut update = LayerUpdate::default();
        self.generation = self.generation.wrapping_add(1);
        let Some(url_zoom) = self.url_zoom else {
            update.events.push(TileEvent::AllLoaded);
            return update;
        };
        let coords: Vec<TileCoord> = self.tiles.keys().copied().collect();
        update.events.extend(self.unload_all());
        for coord in &coords {
            self.tiles.insert(*coord, TileSlot::Loading);
            update.requests.push(self.request(*coord, url_zoom));
        }
        if coords.is_empty() {
            update.events.push(TileEvent::AllLoaded);
        }
        update
    }

    /// A requested image arrived. Stale answers (older generation, other zoom, tile gone) are
    /// ignored and the image dropped.
    pub fn tile_loaded(&mut self, request: &TileRequest, image: I) -> Vec<TileEvent> {
        if !self.is_pending(request) {
            return Vec::new();
        }
        self.tiles.insert(request.coord, TileSlot::Ready(image));
        let mut events = vec![TileEvent::Load {
            coord: request.coord,
            url_zoom: request.url_zoom,
        }];
        if !self.is_loading() {
            events.push(TileEvent::AllLoaded);
        }
        events
    }

    pub fn tile_failed(&mut self, request: &TileRequest) -> Vec<TileEvent> {
        if !self.is_pending(request) {
            return Vec::new();
        }
        self.tiles.insert(request.coord, TileSlot::Failed);
        if self.is_loading() {
            Vec::new()
        } else {
            vec![TileEvent::AllLoaded]
        }
    }

    /// Drop everything, e.g. when the renderer or world goes away.
    pub fn detach(&mut self) -> Vec<TileEvent> {
        let events = self.unload_all();
        self.url_zoom = None;
        events
    }

    /// Whether `request` is still wanted: same layer, generation and zoom, tile still loading.
    pub fn is_pending(&self, request: &TileRequest) -> bool {
        request.slot == self.slot
            && request.generation == self.generation
            && Some(request.url_zoom) == self.url_zoom
            && matches!(self.tiles.get(&request.coord), Some(TileSlot::Loading))
    }

    fn request(&self, coord: TileCoord, url_zoom: u32) -> TileRequest {
        TileRequest {
            slot: self.slot,
            coord,
            url_zoom,
            generation: self.generation,
        }
    }

    fn unload_all(&mut self) -> Vec<TileEvent> {
        let Some(url_zoom) = self.url_zoom else {
            self.tiles.clear();
            return Vec::new();
        };
        let mut events: Vec<TileEvent> = self
            .tiles
            .drain()
            .filter_map(|(coord, slot)| match slot {
                TileSlot::Ready(_) => Some(TileEvent::Unload { coord, url_zoom }),
                _ => None,
            })
            .collect();
        events.sort_by_key(|event| match event {
            TileEvent::Unload { coord, .. } => *coord,
            _ => TileCoord::new(0, 0),
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockBounds, LayerState, TileCoord, TileEvent, TileLayer};

    fn layer() -> TileLayer<()> {
        TileLayer::new(0, "basic", 0, LayerState::Visible)
    }

    #[test]
    fn key_format() {
        assert_eq!(TileCoord::new(-3, 7).key(), "-3_7");
    }

    #[test]
    fn bounds_cover_partial_tiles() {
        let bounds = BlockBounds {
            min_x: -10.0,
            min_z: 0.0,
            max_x: 600.0,
            max_z: 10.0,
        };
        assert_eq!(
            bounds.tiles(0),
            vec![
                TileCoord::new(-1, 0),
                TileCoord::new(0, 0),
                TileCoord::new(1, 0)
            ]
        );
        assert_eq!(bounds.tiles(1), vec![TileCoord::new(-1, 0), TileCoord::new(0, 0)]);
    }

    #[test]
    fn first_view_requests_and_reports_zoom() {
        let mut layer = layer();
        let wanted = [TileCoord::new(0, 0), TileCoord::new(1, 0)];
        let update = layer.set_view(2, &wanted);
        assert_eq!(update.requests.len(), 2);
        assert_eq!(
            update.events,
            vec![TileEvent::ZoomChanged { from: None, to: 2 }]
        );
        assert!(layer.is_loading());
    }

    #[test]
    fn load_events_then_all_loaded_once() {
        let mut layer = layer();
        let update = layer.set_view(0, &[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        let first = layer.tile_loaded(&update.requests[0], ());
        assert_eq!(first.len(), 1);
        let second = layer.tile_loaded(&update.requests[1], ());
        assert_eq!(second.last(), Some(&TileEvent::AllLoaded));
        assert_eq!(layer.ready_tiles().count(), 2);
        assert!(layer.tile_loaded(&update.requests[1], ()).is_empty());
    }

    #[test]
    fn failed_tile_still_completes_the_batch() {
        let mut layer = layer();
        let update = layer.set_view(0, &[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        assert!(layer.tile_failed(&update.requests[0]).is_empty());
        let events = layer.tile_loaded(&update.requests[1], ());
        assert_eq!(events.last(), Some(&TileEvent::AllLoaded));
    }

    #[test]
    fn panning_unloads_only_loaded_tiles_that_left() {
        let mut layer = layer();
        let update = layer.set_view(0, &[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        layer.tile_loaded(&update.requests[0], ());
        let update = layer.set_view(0, &[TileCoord::new(2, 0)]);
        assert_eq!(
            update.events,
            vec![TileEvent::Unload {
                coord: TileCoord::new(0, 0),
                url_zoom: 0
            }]
        );
        assert_eq!(update.requests.len(), 1);
        assert_eq!(update.requests[0].coord, TileCoord::new(2, 0));
    }

    #[test]
    fn zoom_change_unloads_everything_first() {
        let mut layer = layer();
        let update = layer.set_view(1, &[TileCoord::new(0, 0)]);
        layer.tile_loaded(&update.requests[0], ());
        let update = layer.set_view(0, &[TileCoord::new(0, 0)]);
        assert_eq!(
            update.events,
            vec![
                TileEvent::Unload {
                    coord: TileCoord::new(0, 0),
                    url_zoom: 1
                },
                TileEvent::ZoomChanged {
                    from: Some(1),
                    to: 0
                },
            ]
        );
        assert_eq!(update.requests[0].url_zoom, 0);
    }

    #[test]
    fn stale_answers_are_ignored() {
        let mut layer = layer();
        let old = layer.set_view(1, &[TileCoord::new(0, 0)]);
        layer.set_view(0, &[TileCoord::new(0, 0)]);
        assert!(layer.tile_loaded(&old.requests[0], ()).is_empty());

        let current = layer.set_view(0, &[TileCoord::new(0, 0)]);
        assert!(current.requests.is_empty());
        let redraw = layer.redraw();
        assert_eq!(redraw.requests[0].generation, 1);
        let mut previous_generation = redraw.requests[0];
        previous_generation.generation = 0;
        assert!(layer.tile_loaded(&previous_generation, ()).is_empty());
        assert_eq!(
            layer.tile_loaded(&redraw.requests[0], ()).last(),
            Some(&TileEvent::AllLoaded)
        );
    }

    #[test]
    fn redraw_of_empty_layer_completes_immediately() {
        let mut layer = layer();
        assert_eq!(layer.redraw().events, vec![TileEvent::AllLoaded]);
        layer.set_view(0, &[]);
        assert_eq!(layer.redraw().events, vec![TileEvent::AllLoaded]);
    }

    #[test]
    fn detach_unloads_and_forgets_zoom() {
        let mut layer = layer();
        let update = layer.set_view(3, &[TileCoord::new(0, 0)]);
        layer.tile_loaded(&update.requests[0], ());
        assert_eq!(
            layer.detach(),
            vec![TileEvent::Unload {
                coord: TileCoord::new(0, 0),
                url_zoom: 3
            }]
        );
        assert_eq!(layer.url_zoom(), None);
        assert_eq!(layer.ready_tiles().count(), 0);
    }
}
