use serde::{Deserialize, Serialize};

pub const MARKERS_EVENT: &str = "markers";
pub const SETTINGS_EVENT: &str = "settings";

/// Data of a `markers` push event: one layer of one world changed and should be re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkersChanged {
    pub world: String,
    pub key: String,
}
