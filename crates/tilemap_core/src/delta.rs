//! Wire types shared with the editor client.
//!
//! Deltas use the editor's action shape:
//! `{"type": "ADD_TILE", "payload": {"x": 1, "y": 2, "tileId": "grass"}}`.

use serde::{Deserialize, Serialize};

/// Target of a single tile mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilePayload {
    pub x: i64,
    pub y: i64,
    pub tile_id: String,
}

/// One intended mutation of a room's tilemap.
///
/// `RemoveTile` carries the tile id because the id's layer selects which
/// byte of the cell is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Delta {
    AddTile(TilePayload),
    RemoveTile(TilePayload),
}

impl Delta {
    pub fn add(x: i64, y: i64, tile_id: impl Into<String>) -> Self {
        Delta::AddTile(TilePayload {
            x,
            y,
            tile_id: tile_id.into(),
        })
    }

    pub fn remove(x: i64, y: i64, tile_id: impl Into<String>) -> Self {
        Delta::RemoveTile(TilePayload {
            x,
            y,
            tile_id: tile_id.into(),
        })
    }

    pub fn payload(&self) -> &TilePayload {
        match self {
            Delta::AddTile(payload) | Delta::RemoveTile(payload) => payload,
        }
    }
}

/// Parse a submitted batch element by element.
///
/// Elements that are not well-formed deltas are skipped so one bad entry
/// never sinks its siblings. Returns the parsed deltas in order and the
/// number of skipped elements.
pub fn parse_batch(raw: Vec<serde_json::Value>) -> (Vec<Delta>, usize) {
    let total = raw.len();
    let deltas: Vec<Delta> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    let skipped = total - deltas.len();
    (deltas, skipped)
}

/// A tile decoded from a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedTile {
    pub x: u32,
    pub y: u32,
    pub tile_id: String,
}

/// Snapshot handed to clients on init.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilemapState {
    pub placed_tiles: Vec<PlacedTile>,
    pub background_tile_id: Option<String>,
    pub tile_to_replace: Option<String>,
}

impl TilemapState {
    pub fn from_tiles(placed_tiles: Vec<PlacedTile>) -> Self {
        Self {
            placed_tiles,
            ..Default::default()
        }
    }
}
