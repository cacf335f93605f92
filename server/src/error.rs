//! Coordinator error types.

use shared::ProtocolError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    /// The room shut down while the request was queued.
    #[error("Room {0} is closed")]
    RoomClosed(String),

    #[error("Failed to join room")]
    Store(#[from] StoreError),

    #[error("Invalid message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
