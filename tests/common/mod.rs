#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for match server integration tests.
//!
//! [`TestClient`] stands in for a transport front end: it holds one
//! connection's handle + outbox and drives the server directly through
//! its public dispatch API, so tests observe exactly the messages a
//! real socket would carry.

use noughts_server::protocol::{ClientMessage, RoomCode, ServerMessage};
use noughts_server::{ConnectionHandle, MatchServer, Outbox};

/// One simulated client connection.
pub struct TestClient {
    pub conn: ConnectionHandle,
    pub outbox: Outbox,
}

impl TestClient {
    /// Open a connection without logging in.
    pub fn connect(server: &MatchServer) -> Self {
        let (conn, outbox) = server.open_connection();
        Self { conn, outbox }
    }

    /// Open a connection and log in with `name`, draining the login
    /// response and lobby pushes.
    pub async fn login(server: &MatchServer, name: &str) -> Self {
        let mut client = Self::connect(server);
        client
            .send(
                server,
                ClientMessage::Login {
                    username: name.into(),
                    reconnect: false,
                    room: None,
                },
            )
            .await;
        let first = client.expect();
        assert!(
            matches!(first, ServerMessage::LoginSuccess { .. }),
            "expected login_success for {name}, got {first:?}"
        );
        client.drain();
        client
    }

    /// Dispatch one message as this client.
    pub async fn send(&mut self, server: &MatchServer, msg: ClientMessage) {
        server.handle_message(&self.conn, msg).await;
    }

    /// Next queued message, if any. Dispatch is synchronous, so
    /// everything a handler produced is already here.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.outbox.try_recv().ok()
    }

    /// Next queued message; panics if the outbox is empty.
    pub fn expect(&mut self) -> ServerMessage {
        self.try_recv().unwrap_or_else(|| {
            panic!("expected a queued server message, but the outbox is empty")
        })
    }

    /// Drain and return everything currently queued.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut msgs = Vec::new();
        while let Some(msg) = self.try_recv() {
            msgs.push(msg);
        }
        msgs
    }
}

/// Create a room as `client`, returning its code. Lobby pushes are
/// drained.
pub async fn create_room(server: &MatchServer, client: &mut TestClient) -> RoomCode {
    client.send(server, ClientMessage::CreateRoom).await;
    // Drain everything queued and pick out the room_created. Any
    // leading messages are stale lobby pushes (e.g. a players_update
    // from a later login) that landed before this call.
    let mut code = None;
    for msg in client.drain() {
        if let ServerMessage::RoomCreated { room_id, .. } = msg {
            code = Some(room_id);
        }
    }
    code.unwrap_or_else(|| panic!("expected room_created, but none was queued"))
}

/// Log two players in and seat them in one room together. Both
/// outboxes are drained afterwards.
pub async fn pair_in_room(
    server: &MatchServer,
    x_name: &str,
    o_name: &str,
) -> (TestClient, TestClient, RoomCode) {
    let mut x = TestClient::login(server, x_name).await;
    let mut o = TestClient::login(server, o_name).await;
    let code = create_room(server, &mut x).await;
    o.send(
        server,
        ClientMessage::JoinRoom {
            room_id: code.clone(),
        },
    )
    .await;
    x.drain();
    o.drain();
    (x, o, code)
}
