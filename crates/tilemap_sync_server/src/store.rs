//! Per-room tilemap buffers.
//!
//! Buffers are stored whole under `tilemap:<room_id>` next to the room's
//! `last_score`, the highest delta-log score committed for the room.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tilemap_core::{MapGeometry, TilemapBuffer};
use tracing::debug;

use crate::error::StoreError;
use crate::room::RoomId;

/// A room's buffer as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTilemap {
    pub buffer: TilemapBuffer,
    pub last_score: i64,
}

/// Tilemap buffer operations, scoped to one open connection or transaction.
pub struct TilemapStore<'a> {
    conn: &'a Connection,
}

impl<'a> TilemapStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Return the room's buffer, creating and persisting an all-empty one on
    /// first access.
    ///
    /// Creation is a conditional insert, so concurrent first accesses commit
    /// exactly one initial buffer.
    pub fn ensure(&self, room: &RoomId, geometry: MapGeometry) -> Result<StoredTilemap, StoreError> {
        let now = Utc::now().timestamp();
        let created = self.conn.execute(
            "INSERT OR IGNORE INTO tilemaps (key, data, last_score, created_at, updated_at)
             VALUES (?, zeroblob(?), 0, ?, ?)",
            params![room.tilemap_key(), geometry.buffer_len() as i64, now, now],
        )?;
        if created > 0 {
            debug!(
                "Created {}x{}x{} tilemap for room {}",
                geometry.width, geometry.height, geometry.layers, room
            );
        }

        self.load(room, geometry)?
            .ok_or_else(|| StoreError::MissingTilemap(room.tilemap_key()))
    }

    /// Read the room's buffer if it exists.
    pub fn load(
        &self,
        room: &RoomId,
        geometry: MapGeometry,
    ) -> Result<Option<StoredTilemap>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT data, last_score FROM tilemaps WHERE key = ?",
                [room.tilemap_key()],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((data, last_score)) => Ok(Some(StoredTilemap {
                buffer: TilemapBuffer::from_bytes(geometry, data)?,
                last_score,
            })),
            None => Ok(None),
        }
    }

    /// Highest committed score for the room, or `None` before first access.
    pub fn last_score(&self, room: &RoomId) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT last_score FROM tilemaps WHERE key = ?",
                [room.tilemap_key()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Overwrite the room's buffer and record the score of the batch that
    /// produced it.
    pub fn persist(
        &self,
        room: &RoomId,
        buffer: &TilemapBuffer,
        last_score: i64,
    ) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        let updated = self.conn.execute(
            "UPDATE tilemaps SET data = ?, last_score = ?, updated_at = ? WHERE key = ?",
            params![buffer.as_bytes(), last_score, now, room.tilemap_key()],
        )?;
        if updated == 0 {
            return Err(StoreError::MissingTilemap(room.tilemap_key()));
        }
        Ok(())
    }
}
