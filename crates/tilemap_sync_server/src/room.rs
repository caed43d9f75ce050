//! Room identifiers and the storage keys derived from them.

use std::fmt;

/// Longest accepted room id.
pub const MAX_ROOM_ID_LEN: usize = 128;

/// Validated identifier of one shared tilemap (e.g. one per post).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Accepts 1–128 visible ASCII characters after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_ROOM_ID_LEN
            || !trimmed.bytes().all(|b| b.is_ascii_graphic())
        {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the room's buffer: `tilemap:<room_id>`.
    pub fn tilemap_key(&self) -> String {
        format!("tilemap:{}", self.0)
    }

    /// Key of the room's delta log: `deltalog:<room_id>`.
    pub fn deltalog_key(&self) -> String {
        format!("deltalog:{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
