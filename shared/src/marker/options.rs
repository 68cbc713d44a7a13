//! Positional style groups attached to a marker: `[stroke, fill, tooltip, popup]`.
//!
//! Every field is optional and stays `None` when absent so renderer defaults apply.
//! An empty array (or `null`) in place of a group means the group is absent.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::colors::Color;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MarkerOptions {
    #[serde(default, deserialize_with = "group")]
    pub stroke: Option<Stroke>,
    #[serde(default, deserialize_with = "group")]
    pub fill: Option<Fill>,
    #[serde(default, deserialize_with = "group")]
    pub tooltip: Option<Tooltip>,
    #[serde(default, deserialize_with = "group")]
    pub popup: Option<Popup>,
}

/// `[enabled, weight, color, lineCap, lineJoin, dashPattern, dashOffset]`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Stroke {
    #[serde(default, deserialize_with = "flag")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub line_cap: Option<LineCap>,
    #[serde(default)]
    pub line_join: Option<LineJoin>,
    #[serde(default)]
    pub dash_pattern: Option<String>,
    #[serde(default)]
    pub dash_offset: Option<String>,
}

/// `[enabled, color, fillRule]`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Fill {
    #[serde(default, deserialize_with = "flag")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub rule: Option<FillRule>,
}

/// `[content, pane, offset, direction, permanent, sticky, opacity]`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Tooltip {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pane: Option<String>,
    #[serde(default)]
    pub offset: Option<[f64; 2]>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "flag")]
    pub permanent: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub sticky: Option<bool>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

/// `[content, pane, offset, maxWidth, minWidth, maxHeight, autoPan, autoClose, closeOnClick]`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Popup {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pane: Option<String>,
    #[serde(default)]
    pub offset: Option<[f64; 2]>,
    #[serde(default)]
    pub max_width: Option<f64>,
    #[serde(default)]
    pub min_width: Option<f64>,
    #[serde(default)]
    pub max_height: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    pub auto_pan: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub auto_close: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub close_on_click: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Butt => "butt",
            Self::Round => "round",
            Self::Square => "square",
        }
    }
}

impl TryFrom<u8> for LineCap {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Butt),
            1 => Ok(Self::Round),
            2 => Ok(Self::Square),
            _ => Err(format!("line cap code {code} out of range")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Miter => "miter",
            Self::Round => "round",
            Self::Bevel => "bevel",
        }
    }
}

impl TryFrom<u8> for LineJoin {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Miter),
            1 => Ok(Self::Round),
            2 => Ok(Self::Bevel),
            _ => Err(format!("line join code {code} out of range")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NonZero => "nonzero",
            Self::EvenOdd => "evenodd",
        }
    }
}

impl TryFrom<u8> for FillRule {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NonZero),
            1 => Ok(Self::EvenOdd),
            _ => Err(format!("fill rule code {code} out of range")),
        }
    }
}

/// Tooltip placement relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Direction {
    Right,
    Left,
    Top,
    Bottom,
    Center,
    Auto,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Left => "left",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Center => "center",
            Self::Auto => "auto",
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Right),
            1 => Ok(Self::Left),
            2 => Ok(Self::Top),
            3 => Ok(Self::Bottom),
            4 => Ok(Self::Center),
            5 => Ok(Self::Auto),
            _ => Err(format!("tooltip direction code {code} out of range")),
        }
    }
}

/// Text shown by a tooltip or popup.
pub trait Content {
    fn content(&self) -> Option<&str>;
}

impl Content for Tooltip {
    fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

impl Content for Popup {
    fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// A positional group; `[]` and `null` both mean absent.
pub(crate) fn group<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        _ => T::deserialize(value).map(Some).map_err(D::Error::custom),
    }
}

/// Booleans travel as `0`/`1` or as JSON booleans.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        Value::Number(n) => Ok(Some(n.as_f64().is_some_and(|v| v != 0.0))),
        other => Err(D::Error::custom(format!("expected flag, got {other}"))),
    }
}
