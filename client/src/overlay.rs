//! Hover tooltips and click popups: hit-testing shapes in screen space and the callouts they
//! open.

use blockmap_shared::LatLng;
use blockmap_shared::marker::{Direction, Geometry, IconImage, Popup, Shape, Tooltip};

use crate::viewport::Viewport;

/// Extra pixels around lines and outlines that still count as a hit.
pub const HIT_SLOP: f64 = 4.0;
const DEFAULT_WEIGHT: f64 = 3.0;
pub const POPUP_MAX_WIDTH: f64 = 300.0;
pub const POPUP_MIN_WIDTH: f64 = 50.0;

/// Screen rectangle of an icon drawn at `(sx, sy)`, or `None` while its image is unknown.
pub type IconBox<'a> = &'a dyn Fn(&IconImage, f64, f64) -> Option<(f64, f64, f64, f64)>;

/// Whether screen point `(px, py)` falls on `shape`.
pub fn hits(shape: &Shape, vp: &Viewport, px: f64, py: f64, icon_box: IconBox<'_>) -> bool {
    let weight = shape
        .stroke
        .as_ref()
        .and_then(|s| s.weight)
        .unwrap_or(DEFAULT_WEIGHT);
    let slop = weight / 2.0 + HIT_SLOP;
    let screen = |p: &LatLng| vp.lat_lng_to_screen(*p);
    match &shape.geometry {
        Geometry::Circle { center, radius } => {
            let (cx, cy) = screen(center);
            (px - cx).hypot(py - cy) <= vp.meters_to_screen(*radius) + slop
        }
        Geometry::Ellipse {
            center,
            radii,
            tilt_degrees,
        } => {
            let (cx, cy) = screen(center);
            let rx = vp.meters_to_screen(radii.0) + slop;
            let ry = vp.meters_to_screen(radii.1) + slop;
            let (sin, cos) = tilt_degrees.to_radians().sin_cos();
            let (dx, dy) = (px - cx, py - cy);
            let lx = dx * cos + dy * sin;
            let ly = -dx * sin + dy * cos;
            (lx / rx).powi(2) + (ly / ry).powi(2) <= 1.0
        }
        Geometry::Icon { position, image } => {
            let (sx, sy) = screen(position);
            icon_box(image, sx, sy)
                .is_some_and(|(x, y, w, h)| px >= x && px <= x + w && py >= y && py <= y + h)
        }
        Geometry::Rectangle { corner1, corner2 } => {
            let (x1, y1) = screen(corner1);
            let (x2, y2) = screen(corner2);
            px >= x1.min(x2) - slop
                && px <= x1.max(x2) + slop
                && py >= y1.min(y2) - slop
                && py <= y1.max(y2) + slop
        }
        Geometry::Polygon(rings) => in_polygon(rings, vp, px, py, slop),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .any(|rings| in_polygon(rings, vp, px, py, slop)),
        Geometry::Polyline(points) => near_line(points, vp, px, py, slop, false),
        Geometry::MultiPolyline(lines) => lines
            .iter()
            .any(|points| near_line(points, vp, px, py, slop, false)),
    }
}

/// Even-odd inside test over every ring, or close to an outline.
fn in_polygon(rings: &[Vec<LatLng>], vp: &Viewport, px: f64, py: f64, slop: f64) -> bool {
    let mut inside = false;
    for ring in rings {
        let points: Vec<(f64, f64)> = ring.iter().map(|p| vp.lat_lng_to_screen(*p)).collect();
        let Some(&last) = points.last() else {
            continue;
        };
        let mut prev = last;
        for &(x, y) in &points {
            let (x0, y0) = prev;
            if (y > py) != (y0 > py) && px < (x0 - x) * (py - y) / (y0 - y) + x {
                inside = !inside;
            }
            prev = (x, y);
        }
    }
    inside || rings.iter().any(|ring| near_line(ring, vp, px, py, slop, true))
}

fn near_line(points: &[LatLng], vp: &Viewport, px: f64, py: f64, slop: f64, closed: bool) -> bool {
    let screen: Vec<(f64, f64)> = points.iter().map(|p| vp.lat_lng_to_screen(*p)).collect();
    let mut segments: Vec<((f64, f64), (f64, f64))> =
        screen.windows(2).map(|pair| (pair[0], pair[1])).collect();
    if closed && let (Some(&first), Some(&last)) = (screen.first(), screen.last()) {
        segments.push((last, first));
    }
    if let [only] = screen.as_slice() {
        segments.push((*only, *only));
    }
    segments
        .iter()
        .any(|&(a, b)| segment_distance(a, b, (px, py)) <= slop)
}

fn segment_distance(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    };
    (p.0 - (a.0 + t * dx)).hypot(p.1 - (a.1 + t * dy))
}

/// Topmost shape under the point that `wanted` accepts. `layers` run bottom to top.
pub fn pick<'a>(
    layers: &[&'a [Shape]],
    vp: &Viewport,
    px: f64,
    py: f64,
    wanted: impl Fn(&Shape) -> bool,
    icon_box: IconBox<'_>,
) -> Option<&'a Shape> {
    layers
        .iter()
        .rev()
        .copied()
        .flat_map(|shapes| shapes.iter().rev())
        .find(|shape| wanted(shape) && hits(shape, vp, px, py, icon_box))
}

pub fn has_hover_tooltip(shape: &Shape) -> bool {
    shape
        .tooltip
        .as_ref()
        .is_some_and(|t| t.options.permanent != Some(true) && !t.text().is_empty())
}

pub fn has_popup(shape: &Shape) -> bool {
    shape.popup.as_ref().is_some_and(|p| !p.text().is_empty())
}

/// Where a shape's tooltip or popup hangs off it: icons use their anchor, other shapes their
/// middle.
pub fn anchor_of(geometry: &Geometry) -> Option<LatLng> {
    match geometry {
        Geometry::Circle { center, .. } | Geometry::Ellipse { center, .. } => Some(*center),
        Geometry::Icon { position, .. } => Some(*position),
        Geometry::Rectangle { corner1, corner2 } => Some(LatLng::new(
            (corner1.lat + corner2.lat) / 2.0,
            (corner1.lng + corner2.lng) / 2.0,
        )),
        Geometry::Polygon(rings) => rings.first().and_then(|ring| bounds_center(ring)),
        Geometry::MultiPolygon(polygons) => polygons
            .first()
            .and_then(|rings| rings.first())
            .and_then(|ring| bounds_center(ring)),
        Geometry::Polyline(points) => points.get(points.len() / 2).copied(),
        Geometry::MultiPolyline(lines) => lines
            .first()
            .and_then(|points| points.get(points.len() / 2).copied()),
    }
}

fn bounds_center(points: &[LatLng]) -> Option<LatLng> {
    let first = points.first()?;
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min.lat = min.lat.min(p.lat);
        min.lng = min.lng.min(p.lng);
        max.lat = max.lat.max(p.lat);
        max.lng = max.lng.max(p.lng);
    }
    Some(LatLng::new((min.lat + max.lat) / 2.0, (min.lng + max.lng) / 2.0))
}

fn icon_offset(geometry: &Geometry, pick: impl Fn(&IconImage) -> Option<[f64; 2]>) -> Option<[f64; 2]> {
    match geometry {
        Geometry::Icon { image, .. } => pick(image),
        _ => None,
    }
}

/// A tooltip on screen, permanent or following the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Callout {
    pub text: String,
    pub at: LatLng,
    pub offset: [f64; 2],
    pub direction: Direction,
    pub opacity: f64,
}

impl Callout {
    /// Sticky tooltips follow the pointer at `pointer`; the rest sit on the shape's anchor.
    pub fn tooltip(shape: &Shape, pointer: LatLng) -> Option<Self> {
        let tooltip = shape.tooltip.as_ref()?;
        let options: &Tooltip = &tooltip.options;
        let at = if options.sticky == Some(true) {
            pointer
        } else {
            anchor_of(&shape.geometry)?
        };
        let offset = icon_offset(&shape.geometry, |icon| icon.tooltip_anchor)
            .or(options.offset)
            .unwrap_or([0.0, 0.0]);
        Some(Self {
            text: tooltip.text().to_string(),
            at,
            offset,
            direction: options.direction.unwrap_or(Direction::Auto),
            opacity: options.opacity.unwrap_or(0.9).clamp(0.0, 1.0),
        })
    }
}

/// An open popup. Vector shapes open it where they were clicked, icons at their popup anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub text: String,
    pub at: LatLng,
    pub offset: [f64; 2],
    pub max_width: f64,
    pub min_width: f64,
    pub max_height: Option<f64>,
    pub auto_pan: bool,
    pub auto_close: bool,
    pub close_on_click: bool,
}

impl OpenPopup {
    pub fn new(shape: &Shape, clicked: LatLng) -> Option<Self> {
        let popup = shape.popup.as_ref()?;
        let options: &Popup = &popup.options;
        let (at, offset) = match &shape.geometry {
            Geometry::Icon { position, .. } => (
                *position,
                icon_offset(&shape.geometry, |icon| icon.popup_anchor).unwrap_or([0.0, 0.0]),
            ),
            _ => (clicked, options.offset.unwrap_or([0.0, 0.0])),
        };
        let max_width = options.max_width.unwrap_or(POPUP_MAX_WIDTH);
        Some(Self {
            text: popup.text().to_string(),
            at,
            offset,
            max_width,
            min_width: options.min_width.unwrap_or(POPUP_MIN_WIDTH).min(max_width),
            max_height: options.max_height,
            auto_pan: options.auto_pan.unwrap_or(true),
            auto_close: options.auto_close.unwrap_or(true),
            close_on_click: options.close_on_click.unwrap_or(true),
        })
    }
}

/// Callouts layered over the map.
#[derive(Debug, Default)]
pub struct Overlay {
    pub hover: Option<Callout>,
    pub popups: Vec<OpenPopup>,
    world: Option<String>,
}

impl Overlay {
    /// Callouts belong to one world; showing another closes them.
    pub fn follow_world(&mut self, name: Option<&str>) {
        if self.world.as_deref() != name {
            self.clear();
            self.world = name.map(str::to_string);
        }
    }

    /// Opening a popup closes every open one that closes on its own.
    pub fn open(&mut self, popup: OpenPopup) {
        self.popups.retain(|open| !open.auto_close);
        self.popups.push(popup);
    }

    /// A click on empty map.
    pub fn click_map(&mut self) {
        self.popups.retain(|open| !open.close_on_click);
    }

    pub fn clear(&mut self) {
        self.hover = None;
        self.popups.clear();
    }
}

/// Greedy word wrap to `max_width` as measured by `measure`. Hard line breaks are kept; a word
/// wider than the limit gets a line of its own.
pub fn wrap_text(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            }
        }
        lines.push(line);
    }
    lines
}

/// Screen delta that brings box `(x, y, w, h)` inside a `width` by `height` view with `pad`
/// pixels to spare, or zero when it already fits.
pub fn auto_pan_delta(rect: (f64, f64, f64, f64), width: f64, height: f64, pad: f64) -> (f64, f64) {
    let (x, y, w, h) = rect;
    let axis = |start: f64, len: f64, limit: f64| {
        if start < pad {
            pad - start
        } else if start + len > limit - pad {
            (limit - pad - start - len).max(pad - start)
        } else {
            0.0
        }
    };
    (axis(x, w, width), axis(y, h, height))
}

/// Screen box of a tooltip of size `(w, h)` hanging off `(x, y)` in `direction`.
pub fn tooltip_box(direction: Direction, x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
    const GAP: f64 = 6.0;
    match direction {
        Direction::Left => (x - w - GAP, y - h / 2.0),
        Direction::Top => (x - w / 2.0, y - h - GAP),
        Direction::Bottom => (x - w / 2.0, y + GAP),
        Direction::Center => (x - w / 2.0, y - h / 2.0),
        Direction::Right | Direction::Auto => (x + GAP, y - h / 2.0),
    }
}

/// Popup boxes sit centered above their anchor.
pub fn popup_box(x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
    const TIP: f64 = 10.0;
    (x - w / 2.0, y - h - TIP)
}
