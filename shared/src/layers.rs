//! Marker layer descriptors and the z-index convention every map layer follows.

use serde::{Deserialize, Serialize};

/// Visible base tile layer.
pub const TILE_Z_VISIBLE: i32 = 0;
/// Base tile layer redrawing off-screen.
pub const TILE_Z_HIDDEN: i32 = 1;
/// Lowest z-index a marker layer may take.
pub const OVERLAY_Z_MIN: i32 = 2;
pub const PLAYER_Z: i32 = 100;

/// One entry of `tiles/<world>/markers.json`. DOM styling hints (`pane`, `css`) have no meaning
/// on a canvas and are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerLayerInfo {
    pub key: String,
    pub label: String,
    /// Seconds between polls; 0 fetches once.
    #[serde(default)]
    pub update_interval: u32,
    #[serde(default = "yes")]
    pub show_controls: bool,
    #[serde(default)]
    pub default_hidden: bool,
    #[serde(default)]
    pub z_index: i32,
}

impl MarkerLayerInfo {
    /// Marker layers always sit above base tiles and below players.
    pub fn effective_z_index(&self) -> i32 {
        self.z_index.clamp(OVERLAY_Z_MIN, PLAYER_Z - 1)
    }
}

fn yes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::{MarkerLayerInfo, OVERLAY_Z_MIN, PLAYER_Z};

    #[test]
    fn parses_marker_index_entry_with_defaults() {
        let layers: Vec<MarkerLayerInfo> = serde_json::from_str(
            r#"[
                {"key": "spawn", "label": "Spawn", "updateInterval": 15, "zIndex": 5, "pane": "spawn", "css": "spawn-layer"},
                {"key": "claims", "label": "Claims", "defaultHidden": true, "showControls": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(layers[0].update_interval, 15);
        assert!(layers[0].show_controls);
        assert_eq!(layers[0].effective_z_index(), 5);
        assert_eq!(layers[1].update_interval, 0);
        assert!(layers[1].default_hidden);
        assert!(!layers[1].show_controls);
        assert_eq!(layers[1].effective_z_index(), OVERLAY_Z_MIN);
    }

    #[test]
    fn z_index_never_reaches_player_pane() {
        let info = MarkerLayerInfo {
            key: "k".into(),
            label: "l".into(),
            update_interval: 0,
            show_controls: true,
            default_hidden: false,
            z_index: 500,
        };
        assert_eq!(info.effective_z_index(), PLAYER_Z - 1);
    }
}
