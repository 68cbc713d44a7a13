use serde::{Deserialize, Deserializer, Serialize};

/// Deepest zoom-out a world may declare: tile math on `i32` block coordinates shifts by
/// `9 + url_zoom`, which must stay below 32.
pub const MAX_OUT_LIMIT: u32 = 22;

/// Zoom bounds from a world's settings.
///
/// `max_out` native steps exist on the server (URL zoom 0 is one pixel per block, each higher URL
/// zoom halves the resolution); `max_in` extra display steps upscale the finest native tiles.
/// Display zoom 0 is the most zoomed-out view, display zoom `max_out` is 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zoom {
    /// Initial zoom relative to 1:1; negative values start zoomed out.
    #[serde(default)]
    pub default: i32,
    #[serde(deserialize_with = "bounded_max_out")]
    pub max_out: u32,
    #[serde(default)]
    pub max_in: u32,
}

impl Zoom {
    pub const fn new(default: i32, max_out: u32, max_in: u32) -> Self {
        Self {
            default,
            max_out,
            max_in,
        }
    }

    /// Highest display zoom the map allows (`configuredMaxZoom`).
    pub const fn max_zoom(&self) -> u32 {
        self.max_out + self.max_in
    }

    pub const fn zoom_offset(&self) -> i32 {
        -(self.max_in as i32)
    }

    /// `(configuredMaxZoom - nativeZoom) + zoomOffset`.
    ///
    /// Equals `max_out - native_zoom`; in the stretched range above `max_out` it keeps going
    /// negative, which is why callers fetch with [`Zoom::tile_url_zoom`] instead.
    pub fn url_zoom(&self, native_zoom: u32) -> i32 {
        debug_assert!(
            native_zoom <= self.max_zoom(),
            "native zoom {native_zoom} beyond max zoom {}",
            self.max_zoom()
        );
        (self.max_zoom() as i32 - native_zoom as i32) + self.zoom_offset()
    }

    /// The native tile zoom used to draw `display_zoom`: stretched levels reuse the finest tiles.
    pub fn tile_zoom(&self, display_zoom: u32) -> u32 {
        display_zoom.min(self.max_out)
    }

    /// URL zoom of the tiles fetched while showing `display_zoom`. Never negative.
    pub fn tile_url_zoom(&self, display_zoom: u32) -> u32 {
        self.url_zoom(self.tile_zoom(display_zoom)) as u32
    }

    /// Display zoom the map opens at.
    pub fn initial_zoom(&self) -> u32 {
        (self.max_out as i64 + self.default as i64).clamp(0, self.max_zoom() as i64) as u32
    }

    pub fn clamp_display(&self, zoom: f64) -> f64 {
        zoom.clamp(0.0, self.max_zoom() as f64)
    }
}

fn bounded_max_out<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let max_out = u32::deserialize(deserializer)?;
    if max_out > MAX_OUT_LIMIT {
        return Err(serde::de::Error::custom(format!(
            "maxOut {max_out} exceeds {MAX_OUT_LIMIT}"
        )));
    }
    Ok(max_out)
}
