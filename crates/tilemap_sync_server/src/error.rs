use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tilemap_core::{BufferError, RegistryError};
use tracing::error;

/// Failures of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Tilemap {0} does not exist")]
    MissingTilemap(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
    /// Persisted buffer no longer matches the catalog's geometry.
    #[error("Corrupt tilemap buffer: {0}")]
    CorruptBuffer(#[from] BufferError),
    #[error("Corrupt delta log entry {seq}: {reason}")]
    CorruptLogEntry { seq: i64, reason: String },
    #[error("Failed to encode delta: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Request-level failures of the sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request does not identify a room.
    #[error("Missing room context")]
    MissingContext,
    /// The catalog's map has no fixed geometry.
    #[error("Invalid map size")]
    UnsupportedMapSize,
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl From<RegistryError> for SyncError {
    fn from(_: RegistryError) -> Self {
        SyncError::UnsupportedMapSize
    }
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::MissingContext => StatusCode::BAD_REQUEST,
            SyncError::UnsupportedMapSize | SyncError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            SyncError::Storage(e) => {
                error!("Sync request failed: {}", e);
                (status, "Storage unavailable").into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
