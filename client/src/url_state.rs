#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use gloo_storage::Storage;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::viewport::Viewport;

const STORAGE_KEY: &str = "blockmap_last_world";
const KEYS: [&str; 5] = ["world", "renderer", "x", "z", "zoom"];

/// The shareable part of the view, mirrored in the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub world: Option<String>,
    pub renderer: Option<String>,
    pub x: Option<i64>,
    pub z: Option<i64>,
    pub zoom: Option<u32>,
}

/// World and renderer picked last time, used when the link names none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastSelection {
    pub world: Option<String>,
    pub renderer: Option<String>,
}

impl ViewState {
    /// Unknown keys are ignored; unparsable numbers count as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut state = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "world" => state.world = Some(value.to_string()),
                "renderer" => state.renderer = Some(value.to_string()),
                "x" => state.x = parse_coord(value),
                "z" => state.z = parse_coord(value),
                "zoom" => {
                    state.zoom = value
                        .parse::<f64>()
                        .ok()
                        .filter(|z| z.is_finite() && *z >= 0.0)
                        .map(|z| z.round() as u32)
                }
                _ => {}
            }
        }
        state
    }

    pub fn from_view(world: &str, renderer: &str, vp: &Viewport) -> Self {
        Self {
            world: Some(world.to_string()),
            renderer: Some(renderer.to_string()),
            x: Some(vp.center_x.round() as i64),
            z: Some(vp.center_z.round() as i64),
            zoom: Some(vp.tile_zoom()),
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(KEYS.len());
        if let Some(world) = &self.world {
            pairs.push(("world", world.clone()));
        }
        if let Some(renderer) = &self.renderer {
            pairs.push(("renderer", renderer.clone()));
        }
        if let Some(x) = self.x {
            pairs.push(("x", x.to_string()));
        }
        if let Some(z) = self.z {
            pairs.push(("z", z.to_string()));
        }
        if let Some(zoom) = self.zoom {
            pairs.push(("zoom", zoom.to_string()));
        }
        pairs
    }

    /// Block center, only when the link carries both coordinates.
    pub fn center(&self) -> Option<(f64, f64)> {
        Some((self.x? as f64, self.z? as f64))
    }

    pub fn or_remembered(mut self, last: LastSelection) -> Self {
        if self.world.is_none() {
            self.world = last.world;
            if self.renderer.is_none() {
                self.renderer = last.renderer;
            }
        }
        self
    }
}

fn parse_coord(value: &str) -> Option<i64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
}

/// Parse the page's query string.
pub fn read() -> ViewState {
    let Some(window) = web_sys::window() else {
        return ViewState::default();
    };
    let search = window.location().search().unwrap_or_default();
    let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) else {
        return ViewState::default();
    };
    ViewState::from_pairs(
        KEYS.iter()
            .filter_map(|key| params.get(key).map(|value| (*key, value))),
    )
}

/// Rewrite the query string in place; no navigation, no history entry. Returns the new
/// relative link.
pub fn write(state: &ViewState) -> Option<String> {
    let window = web_sys::window()?;
    let params = web_sys::UrlSearchParams::new().ok()?;
    for (key, value) in state.pairs() {
        params.append(key, &value);
    }
    let url = format!("?{}", String::from(params.to_string()));
    if let Ok(history) = window.history() {
        history
            .replace_state_with_url(&JsValue::NULL, "", Some(&url))
            .ok();
    }
    Some(url)
}

pub fn remembered() -> LastSelection {
    gloo_storage::LocalStorage::get(STORAGE_KEY).unwrap_or_default()
}

pub fn remember(world: &str, renderer: &str) {
    let selection = LastSelection {
        world: Some(world.to_string()),
        renderer: Some(renderer.to_string()),
    };
    let _ = gloo_storage::LocalStorage::set(STORAGE_KEY, &selection);
}

#[cfg(test)]
mod tests {
    use super::{LastSelection, ViewState};
    use crate::viewport::Viewport;
    use blockmap_shared::Zoom;

    #[test]
    fn parses_query_pairs() {
        let state = ViewState::from_pairs([
            ("world", "world_nether"),
            ("renderer", "biomes"),
            ("x", "-120.6"),
            ("z", "44"),
            ("zoom", "3"),
            ("junk", "1"),
        ]);
        assert_eq!(state.world.as_deref(), Some("world_nether"));
        assert_eq!(state.renderer.as_deref(), Some("biomes"));
        assert_eq!(state.x, Some(-121));
        assert_eq!(state.z, Some(44));
        assert_eq!(state.zoom, Some(3));
        assert_eq!(state.center(), Some((-121.0, 44.0)));
    }

    #[test]
    fn bad_values_are_absent() {
        let state = ViewState::from_pairs([("x", "east"), ("z", "1"), ("zoom", "-2"), ("world", " ")]);
        assert_eq!(state.x, None);
        assert_eq!(state.center(), None);
        assert_eq!(state.zoom, None);
        assert_eq!(state.world, None);
    }

    #[test]
    fn pairs_follow_key_order_and_skip_missing() {
        let state = ViewState {
            world: Some("world".into()),
            renderer: None,
            x: Some(5),
            z: Some(-7),
            zoom: Some(2),
        };
        let pairs = state.pairs();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["world", "x", "z", "zoom"]);
        assert_eq!(ViewState::from_pairs(pairs), state);
    }

    #[test]
    fn view_state_from_viewport_rounds() {
        let vp = Viewport::default().for_world(Zoom::new(0, 3, 2), (10.4, -3.6), Some(4.0));
        let state = ViewState::from_view("world", "basic", &vp);
        assert_eq!(state.x, Some(10));
        assert_eq!(state.z, Some(-4));
        assert_eq!(state.zoom, Some(4));
    }

    #[test]
    fn remembered_selection_fills_only_missing_world() {
        let last = LastSelection {
            world: Some("world_the_end".into()),
            renderer: Some("night".into()),
        };
        let from_link = ViewState::from_pairs([("world", "world")]).or_remembered(last.clone());
        assert_eq!(from_link.world.as_deref(), Some("world"));
        assert_eq!(from_link.renderer, None);

        let bare = ViewState::default().or_remembered(last);
        assert_eq!(bare.world.as_deref(), Some("world_the_end"));
        assert_eq!(bare.renderer.as_deref(), Some("night"));
    }
}
