use thiserror::Error;

/// Errors raised while loading the tile catalog or asking it for geometry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The map has no fixed, finite dimensions (missing or `"infinite"`).
    #[error("Unsupported map size: the tile catalog does not declare fixed dimensions")]
    UnsupportedMapSize,
    /// Map dimensions must both be non-zero.
    #[error("Invalid map size {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    /// More tiles than fit in a one-byte numeric id.
    #[error("Tile catalog has {0} tiles; at most 255 are supported")]
    TooManyTiles(usize),
    /// A tile's zIndex is negative or does not fit in a layer slot.
    #[error("Tile {tile_id} has invalid zIndex {z_index}")]
    InvalidLayer { tile_id: String, z_index: i64 },
    #[error("Failed to read tile catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse tile catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a single delta was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaRejection {
    #[error("cell ({x}, {y}) layer {layer} is outside the map")]
    OutOfBounds { x: i64, y: i64, layer: u8 },
    #[error("tile {0} has no numeric id or layer in the catalog")]
    UnresolvableTile(String),
}

/// Errors raised when wrapping persisted bytes in a [`crate::TilemapBuffer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Tilemap buffer is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}
