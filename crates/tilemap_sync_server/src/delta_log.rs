//! Append-only delta log.
//!
//! Each room's log lives under `deltalog:<room_id>`. Entries are scored by
//! their batch timestamp; the autoincrement `seq` orders entries sharing a
//! score, so a batch reads back in submission order. Members are stored as
//! `<token>:<delta json>` where the token is a UUIDv4.

use rusqlite::{Connection, params};
use tilemap_core::Delta;

use crate::error::StoreError;
use crate::room::RoomId;

/// One committed delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub seq: i64,
    pub score: i64,
    pub token: String,
    pub delta: Delta,
}

/// Delta log operations, scoped to one open connection or transaction.
pub struct DeltaLog<'a> {
    conn: &'a Connection,
}

impl<'a> DeltaLog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append one delta under `score`.
    pub fn append(&self, room: &RoomId, score: i64, delta: &Delta) -> Result<LogEntry, StoreError> {
        let token = uuid::Uuid::new_v4().to_string();
        let member = format!("{}:{}", token, serde_json::to_string(delta)?);
        self.conn.execute(
            "INSERT INTO delta_log (log_key, score, member) VALUES (?, ?, ?)",
            params![room.deltalog_key(), score, member],
        )?;

        Ok(LogEntry {
            seq: self.conn.last_insert_rowid(),
            score,
            token,
            delta: delta.clone(),
        })
    }

    /// Entries with `score > since`, ascending by `(score, seq)`.
    pub fn range_since(&self, room: &RoomId, since: i64) -> Result<Vec<LogEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, score, member FROM delta_log
             WHERE log_key = ? AND score > ?
             ORDER BY score ASC, seq ASC",
        )?;
        let rows = stmt.query_map(params![room.deltalog_key(), since], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (seq, score, member) = row?;
            entries.push(parse_member(seq, score, &member)?);
        }
        Ok(entries)
    }
}

fn parse_member(seq: i64, score: i64, member: &str) -> Result<LogEntry, StoreError> {
    let (token, json) = member
        .split_once(':')
        .ok_or_else(|| StoreError::CorruptLogEntry {
            seq,
            reason: "missing token separator".to_string(),
        })?;
    let delta = serde_json::from_str(json).map_err(|e| StoreError::CorruptLogEntry {
        seq,
        reason: e.to_string(),
    })?;

    Ok(LogEntry {
        seq,
        score,
        token: token.to_string(),
        delta,
    })
}
