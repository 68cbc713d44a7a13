use serde::{Deserialize, Serialize};

/// A position in the map projection. `lat` grows north, so block `z` (south) maps to `-lat`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A position in projected pixel space at some display zoom.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Block space <-> projection <-> pixel conversions for one world.
///
/// At display zoom `maxOut` one projected pixel is one block. Every other component converts
/// through this type instead of doing its own scale arithmetic; a world switch builds a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    max_out: u32,
    scale: f64,
}

impl Transform {
    pub fn new(max_out: u32) -> Self {
        Self {
            max_out,
            scale: 0.5f64.powi(max_out as i32),
        }
    }

    pub const fn max_out(&self) -> u32 {
        self.max_out
    }

    /// `2^-maxOut`
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pixels_to_meters(&self, n: f64) -> f64 {
        n * self.scale
    }

    pub fn meters_to_pixels(&self, n: f64) -> f64 {
        n / self.scale
    }

    pub fn to_lat_lng(&self, x: f64, z: f64) -> LatLng {
        LatLng::new(self.pixels_to_meters(-z), self.pixels_to_meters(x))
    }

    /// Like [`Transform::to_lat_lng`] but aimed at the middle of the block, so area shapes line
    /// up with block centers instead of corners.
    pub fn to_centered_lat_lng(&self, x: f64, z: f64) -> LatLng {
        self.to_lat_lng(x + 0.5, z + 0.5)
    }

    /// Inverse of [`Transform::to_lat_lng`]: returns `(x, z)` in blocks.
    pub fn to_point(&self, lat_lng: LatLng) -> (f64, f64) {
        (
            self.meters_to_pixels(lat_lng.lng),
            self.meters_to_pixels(-lat_lng.lat),
        )
    }

    /// Flat projection used by the map: pixel = (lng, -lat) * 2^zoom.
    pub fn project(&self, lat_lng: LatLng, zoom: f64) -> Point {
        let factor = 2f64.powf(zoom);
        Point::new(lat_lng.lng * factor, -lat_lng.lat * factor)
    }

    pub fn unproject(&self, point: Point, zoom: f64) -> LatLng {
        let factor = 2f64.powf(zoom);
        LatLng::new(-point.y / factor, point.x / factor)
    }

    /// Block coordinates to projected pixels at `zoom`.
    pub fn block_to_pixel(&self, x: f64, z: f64, zoom: f64) -> Point {
        self.project(self.to_lat_lng(x, z), zoom)
    }

    /// Projected pixels at `zoom` to block coordinates.
    pub fn pixel_to_block(&self, point: Point, zoom: f64) -> (f64, f64) {
        self.to_point(self.unproject(point, zoom))
    }

    /// How many blocks one screen pixel spans at `zoom`.
    pub fn blocks_per_pixel(&self, zoom: f64) -> f64 {
        self.meters_to_pixels(1.0) / 2f64.powf(zoom)
    }
}
