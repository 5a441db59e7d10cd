//! # Noughts Server
//!
//! Transport-agnostic lobby and match server for online tic-tac-toe.
//!
//! The crate is the server-side core for two-player tic-tac-toe over a
//! persistent connection: a shared lobby with manual room codes, live
//! in-room chat, rematches, and a timed reconnection grace window for
//! abrupt disconnects. It speaks JSON text messages over any
//! message-oriented, ordered, reliable bidirectional channel; a
//! WebSocket front end ships behind the default `transport-websocket`
//! feature.
//!
//! ## Architecture
//!
//! - [`protocol`] — wire-compatible message types
//! - [`engine`] — pure board rules (apply a move, detect win/draw)
//! - [`registry`] — identity → connection/room bindings
//! - [`room`] — room lifecycle with per-room locking
//! - [`session`] — [`MatchServer`], the coordinator that owns it all
//! - [`broadcast`] — lobby-wide and room-scoped pushes
//! - [`transport`] — the connection abstraction front ends implement
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "transport-websocket")]
//! # async fn example() -> noughts_server::Result<()> {
//! use noughts_server::{MatchServer, ServerConfig};
//!
//! let server = MatchServer::new(ServerConfig::new());
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! noughts_server::transports::websocket::serve(listener, server).await?;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use error::{Result, ServerError};
pub use protocol::{ClientMessage, Mark, ServerMessage, Winner};
pub use session::{MatchServer, ServerConfig};
pub use transport::{ConnectionHandle, ConnectionId, Outbox};
