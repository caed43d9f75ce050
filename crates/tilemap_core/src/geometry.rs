//! Map geometry and bounds-checked cell addressing.
//!
//! Every byte offset into a tilemap buffer is produced here, so overflow and
//! range checks live in one place.

use serde::Serialize;

use crate::error::DeltaRejection;

/// Fixed dimensions of a map: `width * height` cells, each with `layers`
/// stacking slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapGeometry {
    pub width: u32,
    pub height: u32,
    pub layers: u8,
}

/// A validated `(x, y, layer)` position and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    pub x: u32,
    pub y: u32,
    pub layer: u8,
    offset: usize,
}

impl CellAddress {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl MapGeometry {
    pub fn new(width: u32, height: u32, layers: u8) -> Self {
        Self {
            width,
            height,
            layers,
        }
    }

    /// Exact buffer length for this geometry.
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }

    /// Resolve `(x, y, layer)` to a cell, rejecting anything outside the map.
    ///
    /// Coordinates are checked per axis, so an `x` past the right edge never
    /// wraps onto the next row.
    pub fn cell(&self, x: i64, y: i64, layer: u8) -> Result<CellAddress, DeltaRejection> {
        let out_of_bounds = DeltaRejection::OutOfBounds { x, y, layer };
        let cx = u32::try_from(x).map_err(|_| out_of_bounds.clone())?;
        let cy = u32::try_from(y).map_err(|_| out_of_bounds.clone())?;
        if cx >= self.width || cy >= self.height || layer >= self.layers {
            return Err(out_of_bounds);
        }

        let offset = (cy as usize * self.width as usize + cx as usize) * self.layers as usize
            + layer as usize;
        Ok(CellAddress {
            x: cx,
            y: cy,
            layer,
            offset,
        })
    }

    /// Inverse of [`MapGeometry::cell`]: `(x, y, layer)` for a byte offset.
    pub fn position_of(&self, offset: usize) -> Option<(u32, u32, u8)> {
        if offset >= self.buffer_len() {
            return None;
        }
        let layers = self.layers as usize;
        let cell = offset / layers;
        let layer = (offset % layers) as u8;
        let x = (cell % self.width as usize) as u32;
        let y = (cell / self.width as usize) as u32;
        Some((x, y, layer))
    }
}
