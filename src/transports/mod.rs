//! Transport front ends for the match server.
//!
//! The core consumes the abstraction in [`crate::transport`]; modules
//! here wire it to concrete network stacks behind feature gates:
//!
//! | Feature                | Front end                       |
//! |------------------------|---------------------------------|
//! | `transport-websocket`  | [`websocket::serve`]            |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> noughts_server::Result<()> {
//! use noughts_server::MatchServer;
//!
//! let server = MatchServer::default();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! noughts_server::transports::websocket::serve(listener, server).await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;
