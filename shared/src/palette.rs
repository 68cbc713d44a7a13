use std::collections::HashMap;

use crate::blockinfo::maybe_gunzip;
use crate::error::DecodeError;

pub const UNKNOWN: &str = "unknown";

/// Index -> name table for blocks or biomes. Id 0 is never named.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    names: HashMap<u16, String>,
}

impl Palette {
    /// Parse `{"1": "minecraft:stone", ...}`, optionally gzip-framed.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let data = maybe_gunzip(bytes)?;
        let raw: HashMap<String, String> = serde_json::from_slice(&data)?;
        let mut names = HashMap::with_capacity(raw.len());
        for (id, name) in raw {
            let parsed = id
                .trim()
                .parse::<u16>()
                .map_err(|_| DecodeError::PaletteId(id.clone()))?;
            if parsed != 0 {
                names.insert(parsed, name);
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: u16) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.names.get(&id).map(String::as_str)
    }

    /// Human-readable name, or [`UNKNOWN`].
    pub fn pretty_name(&self, id: u16) -> String {
        self.name(id)
            .map(prettify)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// `minecraft:dark_oak_log` -> `dark oak log`
pub fn prettify(name: &str) -> String {
    let base = name.rsplit_once(':').map_or(name, |(_, base)| base);
    base.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::{Palette, UNKNOWN, prettify};
    use crate::blockinfo::tests::gzip;
    use crate::error::DecodeError;

    #[test]
    fn parses_id_keyed_object() {
        let palette = Palette::from_bytes(
            br#"{"1":"minecraft:stone","2":"minecraft:grass_block"}"#.to_vec(),
        )
        .unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.name(1), Some("minecraft:stone"));
        assert_eq!(palette.pretty_name(2), "grass block");
        assert_eq!(palette.name(3), None);
    }

    #[test]
    fn id_zero_is_always_unknown() {
        let palette = Palette::from_bytes(br#"{"0":"minecraft:air"}"#.to_vec()).unwrap();
        assert_eq!(palette.name(0), None);
        assert_eq!(palette.pretty_name(0), UNKNOWN);
        assert!(palette.is_empty());
    }

    #[test]
    fn accepts_gzip_framed_payload() {
        let palette = Palette::from_bytes(gzip(br#"{"4":"minecraft:plains"}"#)).unwrap();
        assert_eq!(palette.pretty_name(4), "plains");
    }

    #[test]
    fn non_numeric_id_is_an_error() {
        let err = Palette::from_bytes(br#"{"stone":"minecraft:stone"}"#.to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::PaletteId(id) if id == "stone"));
    }

    #[test]
    fn prettify_strips_namespace() {
        assert_eq!(prettify("minecraft:dark_oak_log"), "dark oak log");
        assert_eq!(prettify("custom_biome"), "custom biome");
        assert_eq!(prettify("mod:sub:thing"), "thing");
    }
}
