//! # Tilemap Core
//!
//! Storage-independent building blocks for a shared, server-authoritative
//! tilemap:
//!
//! - **Catalog**: the tile catalog document (`tiles` + `mapSize`)
//! - **Registry**: stable bijection between tile ids and one-byte numeric ids
//! - **Geometry**: map dimensions and bounds-checked cell addressing
//! - **Buffer**: the flat `width * height * layers` byte encoding of a map
//! - **Delta**: add/remove mutations and the snapshot types handed to clients
//!
//! Used by `tilemap_sync_server`, which adds persistence, the delta log and
//! the HTTP surface.

pub mod buffer;
pub mod catalog;
pub mod delta;
pub mod error;
pub mod geometry;
pub mod registry;

pub use buffer::{BatchOutcome, TilemapBuffer};
pub use catalog::{MapSize, TileConfig, TileDefinition};
pub use delta::{Delta, PlacedTile, TilePayload, TilemapState, parse_batch};
pub use error::{BufferError, DeltaRejection, RegistryError};
pub use geometry::{CellAddress, MapGeometry};
pub use registry::{NumericId, TileInfo, TileRegistry};
