use serde::{Deserialize, Serialize};

use crate::zoom::Zoom;

/// `tiles/settings.json`, also the payload of the `settings` push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub world_settings: Vec<WorldEntry>,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            format: default_format(),
            world_settings: Vec::new(),
            players: Vec::new(),
        }
    }
}

impl GlobalSettings {
    /// Worlds in display order.
    pub fn worlds_sorted(&self) -> Vec<&WorldEntry> {
        let mut worlds: Vec<_> = self.world_settings.iter().collect();
        worlds.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        worlds
    }

    pub fn players_in<'a>(&'a self, world: &'a str) -> impl Iterator<Item = &'a Player> + 'a {
        self.players.iter().filter(move |p| p.world == world)
    }
}

fn default_format() -> String {
    "png".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub uuid: String,
    pub world: String,
    pub position: BlockXZ,
    #[serde(default)]
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockXZ {
    pub x: f64,
    pub z: f64,
}

/// `tiles/<world>/settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSettings {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub spawn: BlockXZ,
    pub zoom: Zoom,
    pub renderers: Vec<Renderer>,
    /// Seconds between tile refreshes; 0 disables.
    #[serde(default)]
    pub tile_update_interval: u32,
    #[serde(default)]
    pub ui: UiFlags,
}

impl WorldSettings {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn renderer(&self, value: &str) -> Option<&Renderer> {
        self.renderers.iter().find(|r| r.value == value)
    }

    pub fn default_renderer(&self) -> Option<&Renderer> {
        self.renderers.first()
    }
}

/// A named tile style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderer {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiFlags {
    pub link: bool,
    pub coords: bool,
    pub blockinfo: bool,
    pub attribution: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            link: true,
            coords: true,
            blockinfo: false,
            attribution: true,
        }
    }
}
