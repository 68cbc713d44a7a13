#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::time::Duration;

use blockmap_shared::endpoints;
use blockmap_shared::marker::{Shape, decode_markers};
use blockmap_shared::{MarkerError, MarkerLayerInfo, Transform};

use crate::fetch::fetch_bytes;
use crate::registry;
use crate::task::RepeatingTask;

/// A world's marker layer: its descriptor, the shapes it currently draws, and the poll loop
/// that keeps them fresh.
pub struct MarkerLayer {
    info: MarkerLayerInfo,
    hidden: bool,
    shapes: Vec<Shape>,
    poll: Option<RepeatingTask>,
}

impl MarkerLayer {
    pub fn new(info: MarkerLayerInfo) -> Self {
        Self {
            hidden: info.default_hidden,
            info,
            shapes: Vec::new(),
            poll: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.info.key
    }

    pub fn label(&self) -> &str {
        &self.info.label
    }

    /// Whether the layer gets a toggle in the layer list.
    pub const fn shows_control(&self) -> bool {
        self.info.show_controls
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn z_index(&self) -> i32 {
        self.info.effective_z_index()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub const fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Swap every shape for the ones decoded from `payload`. A payload that is not an array
    /// leaves the current shapes alone. Returns the markers that were dropped.
    pub fn replace_all(
        &mut self,
        payload: &[u8],
        transform: &Transform,
    ) -> Result<Vec<(usize, MarkerError)>, serde_json::Error> {
        let decoded = decode_markers(payload)?;
        self.shapes.clear();
        self.shapes.extend(
            decoded
                .markers
                .iter()
                .map(|marker| Shape::from_marker(marker, transform)),
        );
        Ok(decoded.dropped)
    }

    /// Fetch now, then every `update_interval` seconds (once when it is 0).
    pub fn start(&mut self, world: &str, session: u32) {
        let interval = match self.info.update_interval {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        };
        let world = world.to_string();
        let key = self.info.key.clone();
        self.poll = Some(RepeatingTask::immediate(interval, move || {
            refresh(world.clone(), session, key.clone())
        }));
    }

    pub fn unload(&mut self) {
        self.poll = None;
        self.shapes.clear();
    }
}

/// One poll cycle. Failures are logged and the cycle skipped; the shapes from the last good
/// payload stay up.
pub async fn refresh(world: String, session: u32, key: String) {
    let url = endpoints::marker_layer(&world, &key);
    match fetch_bytes(&url).await {
        Ok(payload) => {
            registry::with_world(&world, session, |w| w.apply_markers(&key, &payload));
            registry::request_redraw();
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("Marker layer {world}/{key} fetch failed: {e}").into());
        }
    }
}
