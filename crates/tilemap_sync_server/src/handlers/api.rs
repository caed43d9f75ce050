use crate::error::SyncError;
use crate::handlers::{RoomContext, ws::subscribe_handler};
use crate::sync::{CatchUpResponse, InitResponse, SyncService};
use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Json},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tilemap_core::{MapGeometry, parse_batch};
use tracing::debug;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub sync: Arc<SyncService>,
}

/// Server status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub tile_count: usize,
    /// `None` when the catalog's map has no fixed size.
    pub map: Option<MapGeometry>,
    pub fanout_enabled: bool,
    pub active_rooms: usize,
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    pub since: Option<i64>,
}

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/init", get(init_room))
        .route("/deltas", get(get_deltas).post(post_deltas))
        .route("/subscribe", get(subscribe_handler))
        .with_state(state)
}

/// GET /api/status
async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    let registry = state.sync.registry();
    let fanout = state.sync.fanout();
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tile_count: registry.len(),
        map: registry.geometry().ok(),
        fanout_enabled: fanout.is_some(),
        active_rooms: fanout.map(|f| f.active_rooms()).unwrap_or(0),
    })
}

/// GET /api/init - Room snapshot and catch-up cursor
async fn init_room(
    State(state): State<ApiState>,
    RoomContext(room): RoomContext,
) -> Result<Json<InitResponse>, SyncError> {
    Ok(Json(state.sync.init(&room)?))
}

/// GET /api/deltas?since= - Deltas committed after a cursor
async fn get_deltas(
    State(state): State<ApiState>,
    RoomContext(room): RoomContext,
    Query(query): Query<SinceQuery>,
) -> Result<Json<CatchUpResponse>, SyncError> {
    Ok(Json(state.sync.catch_up(&room, query.since.unwrap_or(0))?))
}

/// POST /api/deltas - Apply and log a batch
///
/// Elements that do not parse as deltas are dropped individually, like
/// deltas that fail to apply.
async fn post_deltas(
    State(state): State<ApiState>,
    RoomContext(room): RoomContext,
    Json(raw): Json<Vec<serde_json::Value>>,
) -> Result<&'static str, SyncError> {
    let (deltas, malformed) = parse_batch(raw);
    if malformed > 0 {
        debug!("Dropped {} malformed deltas for room {}", malformed, room);
    }
    state.sync.submit(&room, deltas)?;
    Ok("OK")
}
