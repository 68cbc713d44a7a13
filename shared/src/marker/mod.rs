//! Marker layer payloads: `[[kind, data, options?], ...]`.
//!
//! Each element is decoded on its own; a malformed or unknown marker is dropped without
//! affecting the rest of the layer.

pub mod options;
pub mod shapes;

use serde::Deserialize;
use serde_json::Value;

use crate::error::MarkerError;

pub use options::{
    Content, Direction, Fill, FillRule, LineCap, LineJoin, MarkerOptions, Popup, Stroke, Tooltip,
};
pub use shapes::{Bound, Geometry, IconImage, Shape};

/// Block-space position `[x, z]`.
pub type Pos = [f64; 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Circle,
    Ellipse,
    Icon,
    Polygon,
    MultiPolygon,
    Polyline,
    MultiPolyline,
    Rectangle,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 8] = [
        Self::Circle,
        Self::Ellipse,
        Self::Icon,
        Self::Polygon,
        Self::MultiPolygon,
        Self::Polyline,
        Self::MultiPolyline,
        Self::Rectangle,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "circ" => Self::Circle,
            "elli" => Self::Ellipse,
            "icon" => Self::Icon,
            "poly" => Self::Polygon,
            "multipoly" => Self::MultiPolygon,
            "line" => Self::Polyline,
            "multiline" => Self::MultiPolyline,
            "rect" => Self::Rectangle,
            _ => return None,
        })
    }

    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Circle => "circ",
            Self::Ellipse => "elli",
            Self::Icon => "icon",
            Self::Polygon => "poly",
            Self::MultiPolygon => "multipoly",
            Self::Polyline => "line",
            Self::MultiPolyline => "multiline",
            Self::Rectangle => "rect",
        }
    }
}

/// `[[x, z], radius]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CircleData {
    pub center: Pos,
    pub radius: f64,
}

/// `[[x, z], [rx, rz], tiltDegrees]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EllipseData {
    pub center: Pos,
    pub radii: Pos,
    #[serde(default)]
    pub tilt: f64,
}

/// `[[x, z], image, retina, size, anchor, shadow, shadowRetina, shadowSize, shadowAnchor]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IconData {
    pub point: Pos,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub retina: Option<String>,
    #[serde(default)]
    pub size: Option<Pos>,
    #[serde(default)]
    pub anchor: Option<Pos>,
    #[serde(default)]
    pub shadow: Option<String>,
    #[serde(default)]
    pub shadow_retina: Option<String>,
    #[serde(default)]
    pub shadow_size: Option<Pos>,
    #[serde(default)]
    pub shadow_anchor: Option<Pos>,
}

/// `[[x1, z1], [x2, z2]]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RectangleData {
    pub corner1: Pos,
    pub corner2: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerData {
    Circle(CircleData),
    Ellipse(EllipseData),
    Icon(IconData),
    Polygon(Vec<Vec<Pos>>),
    MultiPolygon(Vec<Vec<Vec<Pos>>>),
    Polyline(Vec<Pos>),
    MultiPolyline(Vec<Vec<Pos>>),
    Rectangle(RectangleData),
}

impl MarkerData {
    pub fn decode(kind: MarkerKind, data: Value) -> Result<Self, MarkerError> {
        let wrap = |source| MarkerError::Data {
            kind: kind.tag(),
            source,
        };
        Ok(match kind {
            MarkerKind::Circle => Self::Circle(serde_json::from_value(data).map_err(wrap)?),
            MarkerKind::Ellipse => Self::Ellipse(serde_json::from_value(data).map_err(wrap)?),
            MarkerKind::Icon => Self::Icon(serde_json::from_value(data).map_err(wrap)?),
            MarkerKind::Polygon => Self::Polygon(serde_json::from_value(data).map_err(wrap)?),
            MarkerKind::MultiPolygon => {
                Self::MultiPolygon(serde_json::from_value(data).map_err(wrap)?)
            }
            MarkerKind::Polyline => Self::Polyline(serde_json::from_value(data).map_err(wrap)?),
            MarkerKind::MultiPolyline => {
                Self::MultiPolyline(serde_json::from_value(data).map_err(wrap)?)
            }
            MarkerKind::Rectangle => Self::Rectangle(serde_json::from_value(data).map_err(wrap)?),
        })
    }

    pub const fn kind(&self) -> MarkerKind {
        match self {
            Self::Circle(_) => MarkerKind::Circle,
            Self::Ellipse(_) => MarkerKind::Ellipse,
            Self::Icon(_) => MarkerKind::Icon,
            Self::Polygon(_) => MarkerKind::Polygon,
            Self::MultiPolygon(_) => MarkerKind::MultiPolygon,
            Self::Polyline(_) => MarkerKind::Polyline,
            Self::MultiPolyline(_) => MarkerKind::MultiPolyline,
            Self::Rectangle(_) => MarkerKind::Rectangle,
        }
    }
}

/// One decoded marker, still in block space.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub data: MarkerData,
    pub options: Option<MarkerOptions>,
}

impl Marker {
    pub const fn kind(&self) -> MarkerKind {
        self.data.kind()
    }

    pub fn from_value(value: Value) -> Result<Self, MarkerError> {
        let Value::Array(mut parts) = value else {
            return Err(MarkerError::NotAnArray);
        };
        if !(2..=3).contains(&parts.len()) {
            return Err(MarkerError::Arity(parts.len()));
        }
        let options = if parts.len() == 3 {
            options::group::<_, MarkerOptions>(parts.pop().unwrap_or(Value::Null))
                .map_err(MarkerError::Options)?
        } else {
            None
        };
        let data = parts.pop().unwrap_or(Value::Null);
        let tag = match parts.pop() {
            Some(Value::String(tag)) => tag,
            _ => return Err(MarkerError::MissingKind),
        };
        let kind = MarkerKind::from_tag(&tag).ok_or(MarkerError::UnknownKind(tag))?;
        Ok(Self {
            data: MarkerData::decode(kind, data)?,
            options,
        })
    }
}

/// Result of decoding one layer payload.
#[derive(Debug, Default)]
pub struct DecodedMarkers {
    pub markers: Vec<Marker>,
    /// Position in the payload and reason of each dropped marker.
    pub dropped: Vec<(usize, MarkerError)>,
}

/// Decode a whole layer. Fails only when the payload is not a JSON array.
pub fn decode_markers(payload: &[u8]) -> Result<DecodedMarkers, serde_json::Error> {
    let items: Vec<Value> = serde_json::from_slice(payload)?;
    let mut decoded = DecodedMarkers {
        markers: Vec::with_capacity(items.len()),
        dropped: Vec::new(),
    };
    for (index, item) in items.into_iter().enumerate() {
        match Marker::from_value(item) {
            Ok(marker) => decoded.markers.push(marker),
            Err(e) => decoded.dropped.push((index, e)),
        }
    }
    Ok(decoded)
}
