//! Delta-log scores and the cursors handed to clients.
//!
//! Scores are wall-clock milliseconds kept strictly increasing per room. A
//! reader's cursor is never ahead of the next commit's score, so catch-up
//! from any issued cursor sees every later batch exactly once.
//!
//! The wall clock can step backwards, so both formulas also take the highest
//! cursor this process has issued: later commits score above it and later
//! cursors never fall below it.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Score for a batch committed at `now` in a room whose last batch was
/// scored `last_score`, after cursors up to `issued` were handed out.
pub fn commit_score(now: i64, last_score: i64, issued: i64) -> i64 {
    now.max(last_score.saturating_add(1))
        .max(issued.saturating_add(1))
}

/// Cursor for a reader observing the room at `now`.
///
/// `now - 1` keeps a batch committed later in the same millisecond strictly
/// above the cursor; `last_score` keeps the cursor past every batch already
/// visible.
pub fn read_cursor(now: i64, last_score: i64, issued: i64) -> i64 {
    now.saturating_sub(1).max(last_score).max(issued)
}

/// Highest cursor handed out so far.
#[derive(Debug, Default)]
pub struct IssuedCursors(AtomicI64);

impl IssuedCursors {
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn record(&self, cursor: i64) {
        self.0.fetch_max(cursor, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_score_tracks_wall_clock() {
        assert_eq!(commit_score(1_000, 0, 0), 1_000);
    }

    #[test]
    fn commit_score_stays_strictly_increasing() {
        assert_eq!(commit_score(1_000, 1_000, 0), 1_001);
        assert_eq!(commit_score(900, 1_000, 0), 1_001);
    }

    #[test]
    fn later_commit_in_same_millisecond_is_after_cursor() {
        let now = 5_000;
        let cursor = read_cursor(now, 0, 0);
        assert!(commit_score(now, 0, cursor) > cursor);
    }

    #[test]
    fn cursor_covers_already_committed_batches() {
        let last = commit_score(5_000, 5_000, 0);
        let cursor = read_cursor(5_000, last, 0);
        assert_eq!(cursor, last);
        assert!(commit_score(5_000, last, cursor) > cursor);
    }

    #[test]
    fn clock_stepping_back_stays_after_issued_cursor() {
        let issued = IssuedCursors::default();
        let cursor = read_cursor(1_000, 0, issued.get());
        issued.record(cursor);
        assert_eq!(cursor, 999);

        // Clock jumped back by half a second before the next commit.
        let score = commit_score(500, 0, issued.get());
        assert!(score > cursor);

        // Cursors never move backwards either.
        assert!(read_cursor(400, score, issued.get()) >= cursor);
    }

    #[test]
    fn record_keeps_the_maximum() {
        let issued = IssuedCursors::default();
        issued.record(10);
        issued.record(3);
        assert_eq!(issued.get(), 10);
    }
}
