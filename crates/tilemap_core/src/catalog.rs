//! Tile catalog document.
//!
//! The catalog is shared with the editor client (`town.json`). Only the
//! fields the server needs are modelled; unknown fields are ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RegistryError;

/// One tile kind in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDefinition {
    /// Layer the tile occupies. Tiles without one can never be placed.
    #[serde(default)]
    pub z_index: Option<i64>,
    /// Render source for the client; opaque to the server.
    #[serde(default, alias = "image")]
    pub src: Option<String>,
}

/// Map dimensions as declared by the catalog.
///
/// Fixed maps are `{"width": w, "height": h}`. Any string (the editor uses
/// `"infinite"`) means the map has no fixed geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapSize {
    Fixed { width: u32, height: u32 },
    Named(String),
}

/// The full tile catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileConfig {
    /// Tiles keyed by id, in document order.
    pub tiles: IndexMap<String, TileDefinition>,
    #[serde(default)]
    pub map_size: Option<MapSize>,
}

impl TileConfig {
    /// Parse a catalog from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Fixed `(width, height)` of the map, if it has one.
    pub fn fixed_size(&self) -> Option<(u32, u32)> {
        match self.map_size {
            Some(MapSize::Fixed { width, height }) => Some((width, height)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_map_size_and_keeps_tile_order() {
        let config = TileConfig::from_json_str(
            r#"{
                "tileSize": 16,
                "mapSize": { "width": 8, "height": 6 },
                "tiles": {
                    "water": { "zIndex": 0, "src": "water.png" },
                    "grass": { "zIndex": 0, "src": "grass.png" },
                    "house": { "zIndex": 1, "image": "house.png" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.fixed_size(), Some((8, 6)));
        let ids: Vec<&str> = config.tiles.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["water", "grass", "house"]);
        assert_eq!(config.tiles["house"].src.as_deref(), Some("house.png"));
    }

    #[test]
    fn infinite_map_has_no_fixed_size() {
        let config =
            TileConfig::from_json_str(r#"{ "mapSize": "infinite", "tiles": {} }"#).unwrap();
        assert_eq!(config.map_size, Some(MapSize::Named("infinite".to_string())));
        assert_eq!(config.fixed_size(), None);
    }

    #[test]
    fn missing_map_size_has_no_fixed_size() {
        let config = TileConfig::from_json_str(r#"{ "tiles": {} }"#).unwrap();
        assert_eq!(config.fixed_size(), None);
    }

    #[test]
    fn tile_without_z_index_parses() {
        let config =
            TileConfig::from_json_str(r#"{ "tiles": { "decal": { "src": "d.png" } } }"#).unwrap();
        assert_eq!(config.tiles["decal"].z_index, None);
    }

    #[test]
    fn reads_catalog_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.json");
        std::fs::write(
            &path,
            r#"{ "mapSize": { "width": 2, "height": 2 }, "tiles": { "grass": { "zIndex": 0 } } }"#,
        )
        .unwrap();

        let config = TileConfig::from_path(&path).unwrap();
        assert_eq!(config.tiles.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TileConfig::from_path("/nonexistent/town.json").unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }
}
