use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tilemap_core::{Delta, TileRegistry, TilemapState};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::db::Database;
use crate::delta_log::DeltaLog;
use crate::error::SyncError;
use crate::room::RoomId;
use crate::store::TilemapStore;

use super::cursor::{IssuedCursors, commit_score, now_millis, read_cursor};
use super::fanout::{CommittedBatch, FanOut};

/// Snapshot returned by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    pub state: TilemapState,
    pub cursor: i64,
}

/// Deltas returned by `catch_up`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUpResponse {
    pub deltas: Vec<Delta>,
    pub cursor: i64,
}

/// What a submit did. Not reported to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Score the batch was logged under; `None` for an empty batch.
    pub committed: Option<i64>,
    pub applied: usize,
    pub dropped: usize,
}

/// Init / submit / catch-up over the room store and delta log.
///
/// Room buffers and logs live in the database, so any number of handlers
/// can share one service. A submit's read-apply-persist-append runs in one
/// write transaction, which serializes submits to the same room.
pub struct SyncService {
    db: Database,
    registry: Arc<TileRegistry>,
    fanout: Option<Arc<FanOut>>,
    clock: fn() -> i64,
    issued: IssuedCursors,
}

impl SyncService {
    pub fn new(db: Database, registry: Arc<TileRegistry>) -> Self {
        Self {
            db,
            registry,
            fanout: None,
            clock: now_millis,
            issued: IssuedCursors::default(),
        }
    }

    /// Push committed batches to live subscribers.
    pub fn with_fanout(mut self, fanout: Arc<FanOut>) -> Self {
        self.fanout = Some(fanout);
        self
    }

    /// Replace the millisecond wall clock used for scores and cursors.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn fanout(&self) -> Option<&FanOut> {
        self.fanout.as_deref()
    }

    /// Cursor for a reader who has seen the room up to `last_score`.
    ///
    /// Must run under the database lock so no commit interleaves.
    fn issue_cursor(&self, last_score: i64) -> i64 {
        let cursor = read_cursor((self.clock)(), last_score, self.issued.get());
        self.issued.record(cursor);
        cursor
    }

    /// Materialize the room's buffer if needed and return its decoded state.
    pub fn init(&self, room: &RoomId) -> Result<InitResponse, SyncError> {
        let geometry = self.registry.geometry()?;
        let (stored, cursor) = self.db.write(|tx| {
            let stored = TilemapStore::new(tx).ensure(room, geometry)?;
            let cursor = self.issue_cursor(stored.last_score);
            Ok((stored, cursor))
        })?;

        let placed_tiles = stored.buffer.decode(&self.registry);
        debug!("Init room {}: {} tiles", room, placed_tiles.len());

        Ok(InitResponse {
            state: TilemapState::from_tiles(placed_tiles),
            cursor,
        })
    }

    /// Apply a batch to the room's buffer, persist it, log every submitted
    /// delta under one score and publish the batch.
    ///
    /// Deltas that are out of bounds or name an unplaceable tile leave the
    /// buffer untouched; the rest of the batch still applies. The log keeps
    /// them too, and replaying it rejects them the same way.
    pub fn submit(&self, room: &RoomId, deltas: Vec<Delta>) -> Result<SubmitOutcome, SyncError> {
        let geometry = self.registry.geometry()?;

        let registry = self.registry.as_ref();
        let (outcome, committed) = self.db.write(|tx| {
            let store = TilemapStore::new(tx);
            let mut stored = store.ensure(room, geometry)?;
            let outcome = stored.buffer.apply_batch(registry, deltas.iter().cloned());
            if deltas.is_empty() {
                return Ok((outcome, None));
            }

            let score = commit_score((self.clock)(), stored.last_score, self.issued.get());
            store.persist(room, &stored.buffer, score)?;
            let log = DeltaLog::new(tx);
            for delta in &deltas {
                log.append(room, score, delta)?;
            }
            Ok((outcome, Some(score)))
        })?;

        for (index, rejection) in &outcome.rejected {
            debug!("Dropped delta {} for room {}: {}", index, room, rejection);
        }
        let applied = outcome.applied.len();
        let dropped = outcome.rejected.len();

        if let Some(score) = committed {
            info!(
                "Committed {} deltas to room {} at {} ({} dropped)",
                deltas.len(),
                room,
                score,
                dropped
            );
            if let Some(fanout) = &self.fanout {
                let receivers = fanout.publish(
                    room,
                    CommittedBatch {
                        deltas,
                        cursor: score,
                    },
                );
                debug!("Fanned out batch for room {} to {} subscribers", room, receivers);
            }
        }

        Ok(SubmitOutcome {
            committed,
            applied,
            dropped,
        })
    }

    /// Every delta committed to the room after `since`, in log order, and
    /// the cursor to pass as `since` next time. Read-only.
    pub fn catch_up(&self, room: &RoomId, since: i64) -> Result<CatchUpResponse, SyncError> {
        let (entries, cursor) = self.db.read(|tx| {
            let entries = DeltaLog::new(tx).range_since(room, since)?;
            let last_score = TilemapStore::new(tx).last_score(room)?.unwrap_or(0);
            Ok((entries, self.issue_cursor(last_score)))
        })?;

        Ok(CatchUpResponse {
            deltas: entries.into_iter().map(|entry| entry.delta).collect(),
            cursor,
        })
    }

    /// Live feed of the room's committed batches, if fan-out is enabled.
    pub fn subscribe(&self, room: &RoomId) -> Option<broadcast::Receiver<Arc<CommittedBatch>>> {
        self.fanout.as_ref().map(|fanout| fanout.subscribe(room))
    }
}
