//! Error types for the match server.

use thiserror::Error;

/// Errors that can occur while operating the match server.
///
/// The player-facing variants carry the exact message strings the wire
/// protocol surfaces in `login_error` / `room_error`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A non-reconnecting login asked for a name that is registered.
    #[error("Username already taken")]
    NameTaken,

    /// A join referenced a room code with no live room behind it.
    #[error("Room not found")]
    RoomNotFound,

    /// A join targeted a room that already seats two players.
    #[error("Room is full")]
    RoomFull,

    /// An operation referenced an identity the registry does not know.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred (transport accept loop, socket handshake).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for match server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
