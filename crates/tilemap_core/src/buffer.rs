//! Compact tilemap encoding.
//!
//! A map is stored as `width * height * layers` bytes. The byte for
//! `(x, y, layer)` lives at `(y * width + x) * layers + layer` and holds the
//! numeric id of the tile on that layer, or 0 when the layer is empty.

use crate::delta::{Delta, PlacedTile};
use crate::error::{BufferError, DeltaRejection};
use crate::geometry::{CellAddress, MapGeometry};
use crate::registry::TileRegistry;

/// Result of applying a batch: the deltas that took effect, in order, and
/// the ones that were dropped with their position in the batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: Vec<Delta>,
    pub rejected: Vec<(usize, DeltaRejection)>,
}

/// A room's tilemap bytes, tied to the geometry they were sized for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilemapBuffer {
    geometry: MapGeometry,
    bytes: Vec<u8>,
}

impl TilemapBuffer {
    /// All-empty buffer for a geometry.
    pub fn empty(geometry: MapGeometry) -> Self {
        Self {
            geometry,
            bytes: vec![0; geometry.buffer_len()],
        }
    }

    /// Wrap persisted bytes, refusing anything not sized for `geometry`.
    pub fn from_bytes(geometry: MapGeometry, bytes: Vec<u8>) -> Result<Self, BufferError> {
        let expected = geometry.buffer_len();
        if bytes.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { geometry, bytes })
    }

    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Numeric id stored at a cell, or `None` if the cell is off the map.
    pub fn get(&self, x: i64, y: i64, layer: u8) -> Option<u8> {
        let cell = self.geometry.cell(x, y, layer).ok()?;
        Some(self.bytes[cell.offset()])
    }

    /// Decode every occupied cell, ordered by y, then x, then layer.
    ///
    /// Bytes whose numeric id is unknown to the registry are skipped.
    pub fn decode(&self, registry: &TileRegistry) -> Vec<PlacedTile> {
        let layers = self.geometry.layers.max(1) as usize;
        let width = self.geometry.width.max(1) as usize;
        let mut placed = Vec::new();

        for (cell_index, cell) in self.bytes.chunks_exact(layers).enumerate() {
            for &numeric_id in cell {
                if numeric_id == 0 {
                    continue;
                }
                if let Some(info) = registry.numeric_to_info(numeric_id) {
                    placed.push(PlacedTile {
                        x: (cell_index % width) as u32,
                        y: (cell_index / width) as u32,
                        tile_id: info.tile_id.clone(),
                    });
                }
            }
        }

        placed
    }

    /// Apply one delta.
    ///
    /// `AddTile` writes the tile's numeric id on its layer; `RemoveTile`
    /// clears the byte on the named tile's layer whatever currently occupies
    /// it. The buffer is untouched when the delta is rejected.
    pub fn apply(
        &mut self,
        registry: &TileRegistry,
        delta: &Delta,
    ) -> Result<CellAddress, DeltaRejection> {
        let payload = delta.payload();
        let (numeric_id, layer) = registry
            .resolve(&payload.tile_id)
            .ok_or_else(|| DeltaRejection::UnresolvableTile(payload.tile_id.clone()))?;
        let cell = self.geometry.cell(payload.x, payload.y, layer)?;

        self.bytes[cell.offset()] = match delta {
            Delta::AddTile(_) => numeric_id,
            Delta::RemoveTile(_) => 0,
        };
        Ok(cell)
    }

    /// Apply deltas in order; later deltas overwrite earlier ones on the same
    /// cell-layer. Rejected deltas are dropped individually.
    pub fn apply_batch(
        &mut self,
        registry: &TileRegistry,
        deltas: impl IntoIterator<Item = Delta>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, delta) in deltas.into_iter().enumerate() {
            match self.apply(registry, &delta) {
                Ok(_) => outcome.applied.push(delta),
                Err(rejection) => outcome.rejected.push((index, rejection)),
            }
        }
        outcome
    }
}
