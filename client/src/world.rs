#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::collections::HashMap;
use std::time::Duration;

use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlImageElement;

use blockmap_shared::blockinfo::tile_span;
use blockmap_shared::endpoints;
use blockmap_shared::{
    BlockBounds, BlockInfo, BlockInfoCache, DoubleTileLayer, Inspection, LayerUpdate,
    MarkerLayerInfo, Palette, TileCoord, TileRequest, Transform, WorldSettings,
};

use crate::fetch::{fetch_biome_palette, fetch_bytes, fetch_marker_index};
use crate::marker_layer::{self, MarkerLayer};
use crate::registry;
use crate::task::RepeatingTask;
use crate::tiles::{self, TileJob};

/// One world: its settings and transform, a double tile layer per renderer, its marker layers
/// and the block-info cache of the tiles on screen.
///
/// `load` and `unload` bracket a session. Everything started during a session (tile fetches,
/// block-info fetches, marker polls, the tile refresh task) is tagged with its number and
/// ignored once the session ends.
pub struct World {
    settings: WorldSettings,
    format: String,
    transform: Transform,
    session: u32,
    loaded: bool,
    biomes: Palette,
    renderer: String,
    tile_layers: HashMap<String, DoubleTileLayer<HtmlImageElement>>,
    marker_layers: Vec<MarkerLayer>,
    block_cache: BlockInfoCache,
    refresh: Option<RepeatingTask>,
    view: Option<(BlockBounds, u32)>,
}

impl World {
    pub fn new(settings: WorldSettings, format: &str) -> Self {
        let tile_layers = settings
            .renderers
            .iter()
            .map(|r| (r.value.clone(), DoubleTileLayer::new(&r.value)))
            .collect();
        let renderer = settings
            .default_renderer()
            .map(|r| r.value.clone())
            .unwrap_or_default();
        Self {
            transform: Transform::new(settings.zoom.max_out),
            settings,
            format: format.to_string(),
            session: 0,
            loaded: false,
            biomes: Palette::default(),
            renderer,
            tile_layers,
            marker_layers: Vec::new(),
            block_cache: BlockInfoCache::new(),
            refresh: None,
            view: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    pub const fn session(&self) -> u32 {
        self.session
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    /// Mark the world loaded under a fresh session number without starting any work. `None`
    /// when it is already loaded.
    pub fn begin_session(&mut self) -> Option<u32> {
        if self.loaded {
            return None;
        }
        self.loaded = true;
        self.session = self.session.wrapping_add(1);
        Some(self.session)
    }

    /// Start a session: fetch biomes and the marker index, and schedule tile refreshes.
    /// Calling it on a loaded world does nothing.
    pub fn load(&mut self) {
        let Some(session) = self.begin_session() else {
            return;
        };
        let name = self.name().to_string();

        spawn_local(load_biomes(name.clone(), session));
        spawn_local(load_marker_index(name.clone(), session));

        if self.settings.tile_update_interval > 0 {
            let interval = Duration::from_secs(u64::from(self.settings.tile_update_interval));
            self.refresh = Some(RepeatingTask::delayed(interval, move || {
                let name = name.clone();
                async move {
                    registry::with_world(&name, session, World::refresh_tiles);
                }
            }));
        }
    }

    /// End the session: stop every task, drop tiles, shapes and cached block info.
    pub fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        self.loaded = false;
        self.session = self.session.wrapping_add(1);
        self.refresh = None;
        for layer in &mut self.marker_layers {
            layer.unload();
        }
        self.marker_layers.clear();
        for layer in self.tile_layers.values_mut() {
            layer.detach();
        }
        self.block_cache.clear();
        self.biomes = Palette::default();
        self.view = None;
    }

    /// Switch the visible renderer without reloading the world.
    pub fn set_renderer(&mut self, value: &str) -> bool {
        if value == self.renderer {
            return true;
        }
        if !self.tile_layers.contains_key(value) {
            return false;
        }
        if let Some(old) = self.tile_layers.get_mut(&self.renderer) {
            let events = old.detach();
            self.block_cache.apply(&events);
        }
        self.renderer = value.to_string();
        if let Some((bounds, zoom)) = self.view.take() {
            self.update_view(bounds, zoom);
        }
        true
    }

    pub fn active_tiles(&self) -> Option<&DoubleTileLayer<HtmlImageElement>> {
        self.tile_layers.get(&self.renderer)
    }

    /// Follow the view with the active renderer's tiles.
    pub fn update_view(&mut self, bounds: BlockBounds, display_zoom: u32) {
        if !self.loaded {
            return;
        }
        self.view = Some((bounds, display_zoom));
        let url_zoom = self.settings.zoom.tile_url_zoom(display_zoom);
        let mut wanted = bounds.tiles(url_zoom);
        sort_from_center(&mut wanted, &bounds, url_zoom);
        let Some(layer) = self.tile_layers.get_mut(&self.renderer) else {
            return;
        };
        let update = layer.set_view(url_zoom, &wanted);
        self.dispatch(update);
    }

    /// Periodic refresh: redraw the hidden layer and swap it in when done.
    pub fn refresh_tiles(&mut self) {
        let Some(layer) = self.tile_layers.get_mut(&self.renderer) else {
            return;
        };
        let (update, swapped) = layer.update_tile_layer();
        self.dispatch(update);
        if swapped {
            registry::request_redraw();
        }
    }

    pub fn wants(&self, renderer: &str, request: &TileRequest) -> bool {
        renderer == self.renderer
            && self
                .tile_layers
                .get(renderer)
                .is_some_and(|layer| layer.is_pending(request))
    }

    /// A tile image arrived (`Some`) or failed (`None`).
    pub fn tile_settled(
        &mut self,
        renderer: &str,
        request: &TileRequest,
        image: Option<HtmlImageElement>,
    ) {
        let Some(layer) = self.tile_layers.get_mut(renderer) else {
            return;
        };
        let (events, _) = match image {
            Some(image) => layer.tile_loaded(request, image),
            None => layer.tile_failed(request),
        };
        let fetch = self.block_cache.apply(&events);
        self.fetch_block_info(fetch);
    }

    fn dispatch(&mut self, update: LayerUpdate) {
        let jobs = update
            .requests
            .iter()
            .map(|request| self.tile_job(*request))
            .collect();
        tiles::enqueue(jobs);
        let fetch = self.block_cache.apply(&update.events);
        self.fetch_block_info(fetch);
    }

    fn tile_job(&self, request: TileRequest) -> TileJob {
        TileJob {
            world: self.name().to_string(),
            session: self.session,
            renderer: self.renderer.clone(),
            src: endpoints::tile(
                self.name(),
                request.url_zoom,
                &self.renderer,
                request.coord.x,
                request.coord.z,
                &self.format,
                request.generation,
            ),
            request,
        }
    }

    fn fetch_block_info(&self, tiles: Vec<(u32, TileCoord)>) {
        if !self.settings.ui.blockinfo {
            return;
        }
        for (url_zoom, coord) in tiles {
            let name = self.name().to_string();
            let session = self.session;
            spawn_local(async move {
                let url = endpoints::block_info(&name, url_zoom, coord.x, coord.z);
                let info = fetch_bytes(&url).await.and_then(|bytes| {
                    BlockInfo::from_bytes(bytes).map_err(|e| format!("parse error: {e}"))
                });
                match info {
                    Ok(info) => {
                        registry::with_world(&name, session, |world| {
                            world.block_cache.insert(url_zoom, coord, info)
                        });
                    }
                    // Unrendered regions have no sidecar.
                    Err(e) if e.starts_with("HTTP 404") => {}
                    Err(e) => {
                        web_sys::console::warn_1(
                            &format!("Block info {name} {url_zoom}/{}: {e}", coord.key()).into(),
                        );
                    }
                }
            });
        }
    }

    /// Hover readout for block `(x, z)`.
    pub fn inspect(&self, x: i32, z: i32, blocks: &Palette) -> Inspection {
        Inspection::new(
            x,
            z,
            self.block_cache.get_block_info(x, z),
            blocks,
            &self.biomes,
        )
    }

    pub fn marker_layers(&self) -> &[MarkerLayer] {
        &self.marker_layers
    }

    pub fn marker_layer_mut(&mut self, key: &str) -> Option<&mut MarkerLayer> {
        self.marker_layers.iter_mut().find(|layer| layer.key() == key)
    }

    /// Replace the marker layers with a fresh index and start polling each.
    pub fn set_marker_layers(&mut self, infos: Vec<MarkerLayerInfo>) {
        for layer in &mut self.marker_layers {
            layer.unload();
        }
        self.marker_layers = infos.into_iter().map(MarkerLayer::new).collect();
        self.marker_layers.sort_by_key(MarkerLayer::z_index);
        let name = self.name().to_string();
        for layer in &mut self.marker_layers {
            layer.start(&name, self.session);
        }
        registry::layers_changed();
    }

    pub fn apply_markers(&mut self, key: &str, payload: &[u8]) {
        let transform = self.transform;
        let Some(layer) = self.marker_layer_mut(key) else {
            return;
        };
        match layer.replace_all(payload, &transform) {
            Ok(dropped) => {
                for (index, reason) in dropped {
                    web_sys::console::warn_1(
                        &format!("Dropped marker {index} of layer {key}: {reason}").into(),
                    );
                }
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("Marker layer {key}: parse error: {e}").into());
            }
        }
    }

    /// Out-of-band refetch of one layer (push event). Unknown keys are ignored.
    pub fn refresh_marker_layer(&self, key: &str) -> bool {
        if !self.loaded || !self.marker_layers.iter().any(|layer| layer.key() == key) {
            return false;
        }
        spawn_local(marker_layer::refresh(
            self.name().to_string(),
            self.session,
            key.to_string(),
        ));
        true
    }
}

async fn load_biomes(name: String, session: u32) {
    match fetch_biome_palette(&name).await {
        Ok(palette) => {
            registry::with_world(&name, session, |world| world.biomes = palette);
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("Biome palette for {name}: {e}").into());
        }
    }
}

async fn load_marker_index(name: String, session: u32) {
    match fetch_marker_index(&name).await {
        Ok(infos) => {
            registry::with_world(&name, session, |world| world.set_marker_layers(infos));
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("Marker index for {name}: {e}").into());
        }
    }
}

/// Nearest tiles to the middle of the view load first.
fn sort_from_center(tiles: &mut [TileCoord], bounds: &BlockBounds, url_zoom: u32) {
    let span = tile_span(url_zoom);
    let cx = (bounds.min_x + bounds.max_x) / 2.0 / span;
    let cz = (bounds.min_z + bounds.max_z) / 2.0 / span;
    let distance = |t: &TileCoord| {
        let dx = t.x as f64 + 0.5 - cx;
        let dz = t.z as f64 + 0.5 - cz;
        dx * dx + dz * dz
    };
    tiles.sort_by(|a, b| distance(a).total_cmp(&distance(b)).then_with(|| a.cmp(b)));
}

#[cfg(test)]
mod tests {
    use super::{World, sort_from_center};
    use blockmap_shared::{BlockBounds, TileCoord, WorldSettings};

    fn settings() -> WorldSettings {
        serde_json::from_str(
            r#"{
                "name": "world",
                "zoom": {"default": 0, "maxOut": 3, "maxIn": 2},
                "renderers": [{"label": "Basic", "value": "basic"}, {"label": "Biomes", "value": "biomes"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn new_world_uses_first_renderer_and_settings_transform() {
        let world = World::new(settings(), "png");
        assert_eq!(world.name(), "world");
        assert_eq!(world.renderer(), "basic");
        assert_eq!(world.transform().max_out(), 3);
        assert!(!world.is_loaded());
        assert!(world.active_tiles().is_some());
    }

    #[test]
    fn sessions_advance_on_begin_and_unload() {
        let mut world = World::new(settings(), "png");
        assert_eq!(world.begin_session(), Some(1));
        assert_eq!(world.begin_session(), None);
        assert!(world.is_loaded());
        world.unload();
        assert!(!world.is_loaded());
        assert_eq!(world.session(), 2);
        assert_eq!(world.begin_session(), Some(3));
    }

    #[test]
    fn unloaded_world_ignores_view_and_unknown_renderer() {
        let mut world = World::new(settings(), "png");
        world.update_view(
            BlockBounds {
                min_x: 0.0,
                min_z: 0.0,
                max_x: 10.0,
                max_z: 10.0,
            },
            3,
        );
        assert!(world.active_tiles().unwrap().visible().url_zoom().is_none());
        assert!(!world.set_renderer("night"));
        assert!(world.set_renderer("biomes"));
        assert_eq!(world.renderer(), "biomes");
    }

    #[test]
    fn center_tiles_sort_first() {
        let bounds = BlockBounds {
            min_x: -512.0,
            min_z: -512.0,
            max_x: 1023.0,
            max_z: 1023.0,
        };
        let mut tiles = bounds.tiles(0);
        sort_from_center(&mut tiles, &bounds, 0);
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[0], TileCoord::new(0, 0));
        for edge in &tiles[1..5] {
            assert!(edge.x == 0 || edge.z == 0, "{edge:?} is a corner");
        }
        for corner in &tiles[5..] {
            assert!(corner.x != 0 && corner.z != 0, "{corner:?} is not a corner");
        }
    }
}
