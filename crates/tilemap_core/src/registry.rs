//! Tile id ↔ numeric id registry.
//!
//! Built once from the catalog at startup and shared read-only afterwards.
//! Numeric ids are assigned in catalog order starting at 1; 0 means "empty".

use std::collections::HashMap;

use crate::catalog::TileConfig;
use crate::error::RegistryError;
use crate::geometry::MapGeometry;

/// One-byte storage substitute for a tile id. Never 0.
pub type NumericId = u8;

/// What a numeric id stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    pub tile_id: String,
    /// `None` for catalog entries without a zIndex; such tiles cannot be placed.
    pub layer: Option<u8>,
}

/// Immutable bijection between tile ids and numeric ids, plus the map
/// geometry declared by the catalog.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    by_id: HashMap<String, NumericId>,
    /// Indexed by `numeric_id - 1`.
    infos: Vec<TileInfo>,
    map_size: Option<(u32, u32)>,
    layers: u8,
}

impl TileRegistry {
    /// Build the registry from a parsed catalog.
    ///
    /// A catalog without fixed dimensions still loads; [`TileRegistry::geometry`]
    /// reports it as unsupported.
    pub fn load(config: &TileConfig) -> Result<Self, RegistryError> {
        if config.tiles.len() > NumericId::MAX as usize {
            return Err(RegistryError::TooManyTiles(config.tiles.len()));
        }

        let mut by_id = HashMap::with_capacity(config.tiles.len());
        let mut infos = Vec::with_capacity(config.tiles.len());
        let mut max_layer: u8 = 0;

        for (index, (tile_id, tile)) in config.tiles.iter().enumerate() {
            let layer = match tile.z_index {
                Some(z_index) => {
                    let layer = u8::try_from(z_index)
                        .ok()
                        .filter(|layer| *layer < u8::MAX)
                        .ok_or_else(|| RegistryError::InvalidLayer {
                            tile_id: tile_id.clone(),
                            z_index,
                        })?;
                    max_layer = max_layer.max(layer);
                    Some(layer)
                }
                None => None,
            };

            let numeric_id = (index + 1) as NumericId;
            by_id.insert(tile_id.clone(), numeric_id);
            infos.push(TileInfo {
                tile_id: tile_id.clone(),
                layer,
            });
        }

        Ok(Self {
            by_id,
            infos,
            map_size: config.fixed_size(),
            layers: max_layer + 1,
        })
    }

    /// Parse a catalog from JSON text and build the registry.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Self::load(&TileConfig::from_json_str(json)?)
    }

    pub fn id_to_numeric(&self, tile_id: &str) -> Option<NumericId> {
        self.by_id.get(tile_id).copied()
    }

    pub fn numeric_to_info(&self, numeric_id: NumericId) -> Option<&TileInfo> {
        let index = (numeric_id as usize).checked_sub(1)?;
        self.infos.get(index)
    }

    /// Numeric id and layer for a placeable tile.
    pub fn resolve(&self, tile_id: &str) -> Option<(NumericId, u8)> {
        let numeric_id = self.id_to_numeric(tile_id)?;
        let layer = self.numeric_to_info(numeric_id)?.layer?;
        Some((numeric_id, layer))
    }

    pub fn layer_of(&self, tile_id: &str) -> Option<u8> {
        self.resolve(tile_id).map(|(_, layer)| layer)
    }

    /// Number of stacking layers per cell (`max zIndex + 1`).
    pub fn layers(&self) -> u8 {
        self.layers
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Fixed map geometry, or `UnsupportedMapSize` for unbounded maps.
    pub fn geometry(&self) -> Result<MapGeometry, RegistryError> {
        let (width, height) = self.map_size.ok_or(RegistryError::UnsupportedMapSize)?;
        if width == 0 || height == 0 {
            return Err(RegistryError::EmptyMap { width, height });
        }
        Ok(MapGeometry::new(width, height, self.layers))
    }
}
