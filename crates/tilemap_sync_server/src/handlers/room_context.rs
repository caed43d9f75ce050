use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::error::SyncError;
use crate::room::RoomId;

/// Header carrying the room id.
pub const ROOM_HEADER: &str = "x-room-id";

#[derive(Debug, Deserialize)]
struct RoomQuery {
    room: Option<String>,
}

/// The room a request targets.
///
/// Read from the `X-Room-Id` header, falling back to the `room` query
/// parameter for clients that cannot set headers (WebSocket upgrades from a
/// browser). Rejects with `SyncError::MissingContext`.
#[derive(Debug, Clone)]
pub struct RoomContext(pub RoomId);

impl<S> FromRequestParts<S> for RoomContext
where
    S: Send + Sync,
{
    type Rejection = SyncError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(ROOM_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(RoomId::parse);

        from_header
            .or_else(|| {
                Query::<RoomQuery>::try_from_uri(&parts.uri)
                    .ok()
                    .and_then(|Query(query)| query.room)
                    .and_then(|room| RoomId::parse(&room))
            })
            .map(RoomContext)
            .ok_or(SyncError::MissingContext)
    }
}
