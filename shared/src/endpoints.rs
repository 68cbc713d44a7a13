//! Relative URLs of everything the map reads from the tile host.

pub const TILES_ROOT: &str = "tiles";
pub const SSE_PATH: &str = "sse";

/// Global settings: world list, online players, tile image format.
pub fn global_settings() -> String {
    format!("{TILES_ROOT}/settings.json")
}

pub fn block_palette() -> String {
    format!("{TILES_ROOT}/blocks.gz")
}

pub fn world_settings(world: &str) -> String {
    format!("{TILES_ROOT}/{world}/settings.json")
}

pub fn biome_palette(world: &str) -> String {
    format!("{TILES_ROOT}/{world}/biomes.gz")
}

pub fn marker_index(world: &str) -> String {
    format!("{TILES_ROOT}/{world}/markers.json")
}

pub fn marker_layer(world: &str, key: &str) -> String {
    format!("{TILES_ROOT}/{world}/markers/{key}.json")
}

/// Raster tile. `generation` busts the browser cache after a layer redraw.
pub fn tile(
    world: &str,
    url_zoom: u32,
    renderer: &str,
    x: i32,
    z: i32,
    format: &str,
    generation: u32,
) -> String {
    if generation == 0 {
        format!("{TILES_ROOT}/{world}/{url_zoom}/{renderer}/{x}_{z}.{format}")
    } else {
        format!("{TILES_ROOT}/{world}/{url_zoom}/{renderer}/{x}_{z}.{format}?{generation}")
    }
}

pub fn block_info(world: &str, url_zoom: u32, x: i32, z: i32) -> String {
    format!("{TILES_ROOT}/{world}/{url_zoom}/blockinfo/{x}_{z}.gz")
}

pub fn icon(name: &str) -> String {
    format!("images/icon/registered/{name}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_urls_follow_world_zoom_renderer_layout() {
        assert_eq!(
            tile("world", 2, "basic", -1, 3, "png", 0),
            "tiles/world/2/basic/-1_3.png"
        );
        assert_eq!(
            tile("world_nether", 0, "biomes", 0, 0, "webp", 7),
            "tiles/world_nether/0/biomes/0_0.webp?7"
        );
        assert_eq!(
            block_info("world", 1, 4, -2),
            "tiles/world/1/blockinfo/4_-2.gz"
        );
    }

    #[test]
    fn marker_urls_are_per_world() {
        assert_eq!(marker_index("world"), "tiles/world/markers.json");
        assert_eq!(
            marker_layer("world", "pl3xmap_spawn"),
            "tiles/world/markers/pl3xmap_spawn.json"
        );
    }
}
