use std::cell::OnceCell;

use crate::coords::{LatLng, Transform};
use crate::endpoints;
use crate::marker::options::{Content, Fill, Popup, Stroke, Tooltip};
use crate::marker::{Marker, MarkerData, Pos};

/// Marker geometry in projection space.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// `radius` in projection units.
    Circle { center: LatLng, radius: f64 },
    Ellipse {
        center: LatLng,
        radii: (f64, f64),
        tilt_degrees: f64,
    },
    Icon { position: LatLng, image: IconImage },
    Polygon(Vec<Vec<LatLng>>),
    MultiPolygon(Vec<Vec<Vec<LatLng>>>),
    Polyline(Vec<LatLng>),
    MultiPolyline(Vec<Vec<LatLng>>),
    Rectangle { corner1: LatLng, corner2: LatLng },
}

impl Geometry {
    /// Closed shapes are filled by default; lines and icons are not.
    pub const fn is_area(&self) -> bool {
        matches!(
            self,
            Self::Circle { .. }
                | Self::Ellipse { .. }
                | Self::Polygon(_)
                | Self::MultiPolygon(_)
                | Self::Rectangle { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IconImage {
    pub url: Option<String>,
    pub retina_url: Option<String>,
    pub size: Option<Pos>,
    pub anchor: Option<Pos>,
    pub shadow_url: Option<String>,
    pub shadow_retina_url: Option<String>,
    pub shadow_size: Option<Pos>,
    pub shadow_anchor: Option<Pos>,
    pub tooltip_anchor: Option<Pos>,
    pub popup_anchor: Option<Pos>,
}

/// A tooltip or popup bound to a shape. The display text is derived from the raw HTML on first
/// use only.
#[derive(Debug, Clone)]
pub struct Bound<T> {
    pub options: T,
    text: OnceCell<String>,
}

impl<T: Content> Bound<T> {
    pub fn new(options: T) -> Self {
        Self {
            options,
            text: OnceCell::new(),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.text.get().is_some()
    }

    /// Plain text for canvas drawing.
    pub fn text(&self) -> &str {
        self.text
            .get_or_init(|| html_to_text(self.options.content().unwrap_or_default()))
    }
}

impl<T: PartialEq> PartialEq for Bound<T> {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options
    }
}

/// A marker ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub geometry: Geometry,
    pub stroke: Option<Stroke>,
    pub fill: Option<Fill>,
    pub tooltip: Option<Bound<Tooltip>>,
    pub popup: Option<Bound<Popup>>,
}

impl Shape {
    pub fn from_marker(marker: &Marker, transform: &Transform) -> Self {
        let options = marker.options.clone().unwrap_or_default();
        let geometry = match &marker.data {
            MarkerData::Circle(circle) => Geometry::Circle {
                center: centered(transform, circle.center),
                radius: transform.pixels_to_meters(circle.radius),
            },
            MarkerData::Ellipse(ellipse) => Geometry::Ellipse {
                center: centered(transform, ellipse.center),
                radii: (
                    transform.pixels_to_meters(ellipse.radii[0]),
                    transform.pixels_to_meters(ellipse.radii[1]),
                ),
                tilt_degrees: ellipse.tilt,
            },
            MarkerData::Icon(icon) => Geometry::Icon {
                position: centered(transform, icon.point),
                image: IconImage {
                    url: icon.image.as_deref().map(endpoints::icon),
                    retina_url: icon.retina.as_deref().map(endpoints::icon),
                    size: icon.size,
                    anchor: icon.anchor,
                    shadow_url: icon.shadow.as_deref().map(endpoints::icon),
                    shadow_retina_url: icon.shadow_retina.as_deref().map(endpoints::icon),
                    shadow_size: icon.shadow_size,
                    shadow_anchor: icon.shadow_anchor,
                    tooltip_anchor: options.tooltip.as_ref().and_then(|t| t.offset),
                    popup_anchor: options.popup.as_ref().and_then(|p| p.offset),
                },
            },
            MarkerData::Polygon(rings) => Geometry::Polygon(centered_rings(transform, rings)),
            MarkerData::MultiPolygon(polygons) => Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| centered_rings(transform, rings))
                    .collect(),
            ),
            MarkerData::Polyline(points) => Geometry::Polyline(corners(transform, points)),
            MarkerData::MultiPolyline(lines) => Geometry::MultiPolyline(
                lines
                    .iter()
                    .map(|points| corners(transform, points))
                    .collect(),
            ),
            MarkerData::Rectangle(rect) => Geometry::Rectangle {
                corner1: centered(transform, rect.corner1),
                corner2: centered(transform, rect.corner2),
            },
        };
        Self {
            geometry,
            stroke: options.stroke,
            fill: options.fill,
            tooltip: options.tooltip.map(Bound::new),
            popup: options.popup.map(Bound::new),
        }
    }
}

fn centered(transform: &Transform, pos: Pos) -> LatLng {
    transform.to_centered_lat_lng(pos[0], pos[1])
}

fn centered_rings(transform: &Transform, rings: &[Vec<Pos>]) -> Vec<Vec<LatLng>> {
    rings
        .iter()
        .map(|ring| ring.iter().map(|p| centered(transform, *p)).collect())
        .collect()
}

fn corners(transform: &Transform, points: &[Pos]) -> Vec<LatLng> {
    points
        .iter()
        .map(|p| transform.to_lat_lng(p[0], p[1]))
        .collect()
}

/// Reduce tooltip/popup HTML to drawable text: `<br>` becomes a newline, other tags are
/// dropped and the common entities decoded.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find(['<', '&']) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        if rest.starts_with('<') {
            let Some(end) = rest.find('>') else {
                out.push_str(rest);
                return out;
            };
            let tag = rest[1..end].trim().trim_end_matches('/').trim();
            if tag.eq_ignore_ascii_case("br") {
                out.push('\n');
            }
            rest = &rest[end + 1..];
        } else {
            let (decoded, len) = match rest.find(';') {
                Some(end) if end <= 6 => match &rest[..=end] {
                    "&amp;" => ("&", end + 1),
                    "&lt;" => ("<", end + 1),
                    "&gt;" => (">", end + 1),
                    "&quot;" => ("\"", end + 1),
                    "&#39;" => ("'", end + 1),
                    "&nbsp;" => (" ", end + 1),
                    _ => ("&", 1),
                },
                _ => ("&", 1),
            };
            out.push_str(decoded);
            rest = &rest[len..];
        }
    }
    out.push_str(rest);
    out
}
