use blockmap_shared::{BlockBounds, LatLng, Point, Transform, Zoom};

/// The visible window onto one world: a block-space center, a display zoom and a CSS-pixel size.
/// Every conversion goes through the world's [`Transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_z: f64,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    transform: Transform,
    limits: Zoom,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            zoom: 0.0,
            width: 1200.0,
            height: 800.0,
            transform: Transform::new(0),
            limits: Zoom::new(0, 0, 0),
        }
    }
}

impl Viewport {
    /// Fresh view of a world, keeping the current canvas size.
    pub fn for_world(&self, limits: Zoom, center: (f64, f64), zoom: Option<f64>) -> Self {
        let zoom = zoom.unwrap_or(limits.initial_zoom() as f64);
        Self {
            center_x: center.0,
            center_z: center.1,
            zoom: limits.clamp_display(zoom),
            width: self.width,
            height: self.height,
            transform: Transform::new(limits.max_out),
            limits,
        }
    }

    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    pub const fn limits(&self) -> Zoom {
        self.limits
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    fn center_pixel(&self) -> Point {
        self.transform
            .block_to_pixel(self.center_x, self.center_z, self.zoom)
    }

    pub fn block_to_screen(&self, x: f64, z: f64) -> (f64, f64) {
        self.lat_lng_to_screen(self.transform.to_lat_lng(x, z))
    }

    pub fn lat_lng_to_screen(&self, lat_lng: LatLng) -> (f64, f64) {
        let p = self.transform.project(lat_lng, self.zoom);
        let c = self.center_pixel();
        (
            p.x - c.x + self.width / 2.0,
            p.y - c.y + self.height / 2.0,
        )
    }

    pub fn screen_to_block(&self, sx: f64, sy: f64) -> (f64, f64) {
        let c = self.center_pixel();
        let p = Point::new(
            sx - self.width / 2.0 + c.x,
            sy - self.height / 2.0 + c.y,
        );
        self.transform.pixel_to_block(p, self.zoom)
    }

    /// Projection-space length (circle radii) in screen pixels.
    pub fn meters_to_screen(&self, meters: f64) -> f64 {
        meters * 2f64.powf(self.zoom)
    }

    /// Move the content by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let (x, z) = self.screen_to_block(self.width / 2.0 - dx, self.height / 2.0 - dy);
        self.center_x = x;
        self.center_z = z;
    }

    /// Change zoom by `steps` keeping the block under `(sx, sy)` in place.
    pub fn zoom_at(&mut self, steps: f64, sx: f64, sy: f64) {
        let (bx, bz) = self.screen_to_block(sx, sy);
        let zoom = self.limits.clamp_display(self.zoom + steps);
        if zoom == self.zoom {
            return;
        }
        self.zoom = zoom;
        let per_px = self.transform.blocks_per_pixel(zoom);
        self.center_x = bx - (sx - self.width / 2.0) * per_px;
        self.center_z = bz - (sy - self.height / 2.0) * per_px;
    }

    pub fn block_bounds(&self) -> BlockBounds {
        let (min_x, min_z) = self.screen_to_block(0.0, 0.0);
        let (max_x, max_z) = self.screen_to_block(self.width, self.height);
        BlockBounds {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    /// Integer display zoom tiles are chosen for.
    pub fn tile_zoom(&self) -> u32 {
        self.limits.clamp_display(self.zoom.round()) as u32
    }
}
