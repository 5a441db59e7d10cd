//! Transport abstraction consumed by the match server core.
//!
//! The core never touches sockets. A transport front end (WebSocket,
//! TCP, an in-process test harness, …) asks the server for a connection
//! via [`MatchServer::open_connection`](crate::MatchServer::open_connection),
//! receives a [`ConnectionHandle`] plus an [`Outbox`], and then:
//!
//! - feeds inbound text frames to
//!   [`MatchServer::handle_text`](crate::MatchServer::handle_text),
//! - drains the [`Outbox`] into its socket,
//! - reports the close/error event (which carries only the connection,
//!   not an identity) via
//!   [`MatchServer::connection_closed`](crate::MatchServer::connection_closed).
//!
//! The channel is the framing boundary: one [`ServerMessage`] per
//! transport frame, order preserved per connection.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Opaque identifier for one live connection. A reconnecting player
/// gets a fresh id; the registry maps ids back to identities.
pub type ConnectionId = Uuid;

/// Receiving half of a connection's outbound queue. The transport
/// front end owns this and writes each message to its socket.
pub type Outbox = mpsc::UnboundedReceiver<ServerMessage>;

/// Sending half of one client connection, held by the registry and
/// cloned wherever a push needs to reach this client.
///
/// Delivery is best-effort: once the [`Outbox`] is dropped (socket
/// gone), sends are silently discarded — no queueing, no retry.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    /// Create a handle/outbox pair for a newly accepted connection.
    pub(crate) fn new_pair() -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// The connection's unique id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message for this connection. Never blocks; a closed
    /// outbox drops the message.
    pub fn send(&self, msg: ServerMessage) {
        if self.tx.send(msg).is_err() {
            tracing::trace!(connection = %self.id, "dropping message for closed connection");
        }
    }
}
