mod schema;

pub use schema::init_database;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::StoreError;

/// Shared handle to the backing SQLite database.
///
/// All room tilemaps and delta logs live in one database so a submit can
/// update both inside a single transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Wrap an already-initialized connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (or create) a database file and apply the schema.
    ///
    /// `busy_timeout` bounds how long a write waits on another process
    /// holding the database lock before failing.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        init_database(&conn)?;
        Ok(Self::new(conn))
    }

    /// Fresh in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self::new(conn))
    }

    /// Run `f` inside a write transaction that takes the database write lock
    /// up front (`BEGIN IMMEDIATE`), committing on success.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` inside a read transaction so every query sees one snapshot.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomId;
    use crate::store::TilemapStore;
    use tilemap_core::MapGeometry;

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tilemap_sync.db");
        let room = RoomId::parse("post-1").unwrap();
        let geometry = MapGeometry::new(2, 2, 1);

        {
            let db = Database::open(&path, Duration::from_millis(100)).unwrap();
            db.write(|tx| {
                let store = TilemapStore::new(tx);
                let mut stored = store.ensure(&room, geometry)?;
                stored.buffer = tilemap_core::TilemapBuffer::from_bytes(geometry, vec![0, 1, 0, 0])?;
                store.persist(&room, &stored.buffer, 42)
            })
            .unwrap();
        }

        let db = Database::open(&path, Duration::from_millis(100)).unwrap();
        let stored = db
            .read(|tx| TilemapStore::new(tx).load(&room, geometry))
            .unwrap()
            .unwrap();
        assert_eq!(stored.buffer.as_bytes(), &[0, 1, 0, 0]);
        assert_eq!(stored.last_score, 42);
    }

    #[test]
    fn failed_write_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let room = RoomId::parse("post-1").unwrap();

        let result: Result<(), StoreError> = db.write(|tx| {
            TilemapStore::new(tx).ensure(&room, MapGeometry::new(1, 1, 1))?;
            Err(StoreError::MissingTilemap("forced".to_string()))
        });
        assert!(result.is_err());

        let last = db.read(|tx| TilemapStore::new(tx).last_score(&room)).unwrap();
        assert_eq!(last, None);
    }
}
