use serde::de::DeserializeOwned;

use blockmap_shared::endpoints;
use blockmap_shared::{GlobalSettings, MarkerLayerInfo, Palette, WorldSettings};

/// GET a JSON document relative to the page.
pub async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<T>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// GET a binary body. The browser inflates `Content-Encoding: gzip` on its own; bodies that
/// arrive still framed are inflated by the decoders.
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.binary()
        .await
        .map_err(|e| format!("fetch error: {e}"))
}

pub async fn fetch_global_settings() -> Result<GlobalSettings, String> {
    fetch_json(&endpoints::global_settings()).await
}

pub async fn fetch_world_settings(world: &str) -> Result<WorldSettings, String> {
    fetch_json(&endpoints::world_settings(world)).await
}

pub async fn fetch_marker_index(world: &str) -> Result<Vec<MarkerLayerInfo>, String> {
    fetch_json(&endpoints::marker_index(world)).await
}

async fn fetch_palette(url: &str) -> Result<Palette, String> {
    let bytes = fetch_bytes(url).await?;
    Palette::from_bytes(bytes).map_err(|e| format!("parse error: {e}"))
}

pub async fn fetch_block_palette() -> Result<Palette, String> {
    fetch_palette(&endpoints::block_palette()).await
}

pub async fn fetch_biome_palette(world: &str) -> Result<Palette, String> {
    fetch_palette(&endpoints::biome_palette(world)).await
}
