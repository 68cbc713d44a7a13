pub mod block_cache;
pub mod blockinfo;
pub mod colors;
pub mod coords;
pub mod double_layer;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod layers;
pub mod marker;
pub mod palette;
pub mod settings;
pub mod tile_layer;
pub mod zoom;

pub use block_cache::{BlockInfoCache, BlockSample, Inspection};
pub use blockinfo::{BlockInfo, BlockRecord};
pub use colors::Color;
pub use coords::{LatLng, Point, Transform};
pub use double_layer::DoubleTileLayer;
pub use error::{DecodeError, MarkerError};
pub use events::*;
pub use layers::MarkerLayerInfo;
pub use palette::Palette;
pub use settings::*;
pub use tile_layer::{BlockBounds, LayerState, LayerUpdate, TileCoord, TileEvent, TileLayer, TileRequest};
pub use zoom::Zoom;
