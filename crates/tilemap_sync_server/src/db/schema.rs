use rusqlite::Connection;

/// SQL schema for room tilemaps and the delta log
const SCHEMA: &str = r#"
-- One row per room: `tilemap:<room_id>` -> raw buffer bytes
CREATE TABLE IF NOT EXISTS tilemaps (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    last_score INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Append-only delta log. `seq` breaks ties between entries sharing a score.
CREATE TABLE IF NOT EXISTS delta_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    log_key TEXT NOT NULL,
    score INTEGER NOT NULL,
    member TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_delta_log_range ON delta_log(log_key, score, seq);
"#;

/// Initialize the database with the tilemap schema
pub fn init_database(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        init_database(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert!(tables.contains(&"tilemaps".to_string()));
        assert!(tables.contains(&"delta_log".to_string()));
    }
}
