//! Session coordinator for the match server.
//!
//! [`MatchServer`] owns all shared mutable state — the identity
//! registry and the room directory — and arbitrates concurrent client
//! actions into a single consistent view. Transport front ends feed it
//! inbound messages via [`MatchServer::handle_text`] /
//! [`MatchServer::handle_message`] and report closes via
//! [`MatchServer::connection_closed`]; everything else is event-driven
//! from those calls and from grace-window timer expiry.
//!
//! # Locking
//!
//! Lock order is `registry` → `rooms` directory → an individual room.
//! A lock on the left is never acquired while holding one to its
//! right. Critical sections never perform I/O: outbound delivery is a
//! non-blocking channel push, so it is safe under any lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broadcast;
use crate::error::ServerError;
use crate::protocol::{
    ClientMessage, Mark, PlayerName, ResumedRoom, RoomCode, ServerMessage,
};
use crate::registry::Registry;
use crate::room::{MoveOutcome, RoomDirectory};
use crate::transport::{ConnectionHandle, ConnectionId, Outbox};

/// Default reconnection grace window after a transport close.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`MatchServer`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use noughts_server::ServerConfig;
///
/// let config = ServerConfig::new().with_grace_period(Duration::from_secs(60));
/// assert_eq!(config.grace_period, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long a disconnected identity keeps its registration and its
    /// room seat while waiting for a reconnect.
    ///
    /// Defaults to **30 seconds**.
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconnection grace window.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

struct Shared {
    config: ServerConfig,
    registry: Mutex<Registry>,
    rooms: Mutex<RoomDirectory>,
    /// Pending grace-window eviction tasks, keyed by identity.
    evictions: Mutex<HashMap<PlayerName, JoinHandle<()>>>,
}

// ── Coordinator ─────────────────────────────────────────────────────

/// The server core. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct MatchServer {
    shared: Arc<Shared>,
}

impl Default for MatchServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl MatchServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry: Mutex::new(Registry::new()),
                rooms: Mutex::new(RoomDirectory::new()),
                evictions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Allocate a handle/outbox pair for a newly accepted transport
    /// connection. Nothing is registered until the client logs in.
    pub fn open_connection(&self) -> (ConnectionHandle, Outbox) {
        ConnectionHandle::new_pair()
    }

    /// Parse one inbound text frame and dispatch it. Malformed
    /// payloads are logged and dropped; the connection stays open.
    pub async fn handle_text(&self, conn: &ConnectionHandle, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(conn, msg).await,
            Err(err) => {
                warn!(connection = %conn.id(), %err, "dropping malformed message");
            }
        }
    }

    /// Dispatch one inbound message to its handler.
    pub async fn handle_message(&self, conn: &ConnectionHandle, msg: ClientMessage) {
        match msg {
            ClientMessage::Login {
                username,
                reconnect,
                room,
            } => self.handle_login(conn, username, reconnect, room).await,
            ClientMessage::Logout => self.handle_logout(conn).await,
            ClientMessage::CreateRoom => self.handle_create_room(conn).await,
            ClientMessage::JoinRoom { room_id } => self.handle_join_room(conn, room_id).await,
            ClientMessage::LeaveRoom => self.handle_leave_room(conn).await,
            ClientMessage::MakeMove { index } => self.handle_make_move(conn, index).await,
            ClientMessage::ChatMessage { message } => self.handle_chat(conn, message).await,
            ClientMessage::RematchRequest => self.handle_rematch(conn).await,
        }
    }

    /// React to a transport close event. The identity keeps its
    /// registration and room seat for the grace window; if no new
    /// connection re-attaches in time, it is evicted.
    pub async fn connection_closed(&self, id: ConnectionId) {
        let username = {
            let registry = self.shared.registry.lock().await;
            registry.lookup_by_connection(id).map(str::to_string)
        };
        let Some(username) = username else {
            debug!(connection = %id, "close event for unregistered connection");
            return;
        };
        info!(%username, "disconnected, reconnect window open");

        let server = self.clone();
        let name = username.clone();
        let grace = self.shared.config.grace_period;
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            server.evict(&name, id).await;
            server.shared.evictions.lock().await.remove(&name);
        });
        // A second disconnect for the same identity supersedes the
        // earlier timer.
        if let Some(stale) = self.shared.evictions.lock().await.insert(username, task) {
            stale.abort();
        }
    }

    /// Sorted snapshot of every registered display name.
    pub async fn registered_players(&self) -> Vec<PlayerName> {
        let mut names = self.shared.registry.lock().await.all_identities();
        names.sort();
        names
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.shared.rooms.lock().await.len()
    }

    // ── Message handlers ────────────────────────────────────────────

    async fn handle_login(
        &self,
        conn: &ConnectionHandle,
        username: PlayerName,
        reconnect: bool,
        remembered: Option<RoomCode>,
    ) {
        // The check-then-insert is atomic under the registry lock.
        {
            let mut registry = self.shared.registry.lock().await;
            let result = if reconnect {
                match registry.reconnect(&username, conn.clone()) {
                    Ok(()) => Ok(()),
                    // Grace window already expired; start over fresh.
                    Err(_) => registry.register(username.clone(), conn.clone()),
                }
            } else {
                registry.register(username.clone(), conn.clone())
            };
            if let Err(err) = result {
                debug!(%username, "login rejected: {err}");
                conn.send(ServerMessage::LoginError {
                    message: err.to_string(),
                });
                return;
            }
        }
        self.cancel_eviction(&username).await;
        info!(%username, reconnect, "player logged in");

        // A reconnecting client with a remembered code resumes its
        // room, provided that room still seats it.
        if reconnect {
            if let Some(code) = remembered {
                if let Some(resumed) = self.resume_room(&username, &code).await {
                    info!(%username, room = %code, "resumed room");
                    conn.send(ServerMessage::LoginSuccess {
                        username,
                        room: Some(resumed),
                    });
                    // A resume goes straight back into the room; no
                    // lobby churn.
                    return;
                }
            }
        }

        conn.send(ServerMessage::LoginSuccess {
            username: username.clone(),
            room: None,
        });

        // A reconnect that did not resume keeps its registration but
        // not its seat: membership is only preserved for the room the
        // client remembered, so any stale seat is vacated.
        if reconnect {
            let stale = {
                let registry = self.shared.registry.lock().await;
                registry.binding(&username).and_then(|b| b.room.clone())
            };
            if let Some(code) = stale {
                self.leave_current_room(&username, &code).await;
            }
        }

        let registry = self.shared.registry.lock().await;
        broadcast::push_players(&registry);
        let rooms = self.shared.rooms.lock().await;
        broadcast::push_rooms(&registry, &rooms).await;
    }

    async fn handle_logout(&self, conn: &ConnectionHandle) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };
        self.cancel_eviction(&username).await;

        let room_code = {
            let registry = self.shared.registry.lock().await;
            registry.binding(&username).and_then(|b| b.room.clone())
        };
        if let Some(code) = room_code {
            self.leave_current_room(&username, &code).await;
        }

        {
            let mut registry = self.shared.registry.lock().await;
            registry.unregister(&username);
            broadcast::push_players(&registry);
        }
        info!(%username, "player logged out");
    }

    async fn handle_create_room(&self, conn: &ConnectionHandle) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };

        // Vacate any existing membership first.
        let prior = {
            let registry = self.shared.registry.lock().await;
            registry.binding(&username).and_then(|b| b.room.clone())
        };
        if let Some(code) = prior {
            self.leave_current_room(&username, &code).await;
        }

        let (code, _room) = self.shared.rooms.lock().await.create(username.clone());
        self.shared
            .registry
            .lock()
            .await
            .set_room(&username, Some(code.clone()));
        info!(%username, room = %code, "room created");

        conn.send(ServerMessage::RoomCreated {
            room_id: code,
            symbol: Mark::X,
            player_x: username,
            player_o: None,
        });

        let registry = self.shared.registry.lock().await;
        let rooms = self.shared.rooms.lock().await;
        broadcast::push_rooms(&registry, &rooms).await;
    }

    async fn handle_join_room(&self, conn: &ConnectionHandle, room_id: RoomCode) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };

        let prior = {
            let registry = self.shared.registry.lock().await;
            registry.binding(&username).and_then(|b| b.room.clone())
        };
        if prior.as_deref() == Some(room_id.as_str()) {
            debug!(%username, room = %room_id, "already seated in this room");
            return;
        }

        let room = self.shared.rooms.lock().await.get(&room_id);
        let Some(room) = room else {
            conn.send(ServerMessage::RoomError {
                message: ServerError::RoomNotFound.to_string(),
            });
            return;
        };

        // Seat into the target before vacating the old room, so a
        // failed join leaves the prior membership untouched.
        let seated = {
            let mut guard = room.lock().await;
            guard
                .join(username.clone())
                .map(|()| guard.player_x().cloned().unwrap_or_default())
        };
        let player_x = match seated {
            Ok(player_x) => player_x,
            Err(err) => {
                debug!(%username, room = %room_id, "join rejected: {err}");
                conn.send(ServerMessage::RoomError {
                    message: err.to_string(),
                });
                return;
            }
        };

        if let Some(code) = prior {
            self.leave_current_room(&username, &code).await;
        }
        self.shared
            .registry
            .lock()
            .await
            .set_room(&username, Some(room_id.clone()));
        info!(%username, room = %room_id, "joined room");

        conn.send(ServerMessage::RoomJoined {
            room_id,
            symbol: Mark::O,
            player_x: player_x.clone(),
            player_o: Some(username.clone()),
        });

        let game_start = ServerMessage::GameStart {
            player_x: player_x.clone(),
            player_o: username.clone(),
        };
        {
            let registry = self.shared.registry.lock().await;
            broadcast::push_room(
                &registry,
                std::slice::from_ref(&player_x),
                &ServerMessage::PlayerJoined {
                    player_name: username.clone(),
                    player_x: player_x.clone(),
                    player_o: Some(username.clone()),
                },
            );
            broadcast::push_room(&registry, std::slice::from_ref(&player_x), &game_start);
        }
        conn.send(game_start);

        let registry = self.shared.registry.lock().await;
        let rooms = self.shared.rooms.lock().await;
        broadcast::push_rooms(&registry, &rooms).await;
    }

    async fn handle_leave_room(&self, conn: &ConnectionHandle) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };
        let room_code = {
            let registry = self.shared.registry.lock().await;
            registry.binding(&username).and_then(|b| b.room.clone())
        };
        let Some(code) = room_code else {
            debug!(%username, "leave_room outside a room");
            return;
        };
        self.leave_current_room(&username, &code).await;
        info!(%username, room = %code, "left room");
    }

    async fn handle_make_move(&self, conn: &ConnectionHandle, index: usize) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };
        let Some(room) = self.current_room(&username).await else {
            return;
        };

        let (outcome, occupants) = {
            let mut guard = room.lock().await;
            match guard.apply_move(&username, index) {
                Ok(outcome) => (outcome, guard.players().to_vec()),
                Err(err) => {
                    // Illegal moves are dropped without a reply; the
                    // base protocol has no rejection message.
                    debug!(%username, index, "move dropped: {err}");
                    return;
                }
            }
        };

        let registry = self.shared.registry.lock().await;
        match outcome {
            MoveOutcome::Applied {
                board,
                mark,
                next_turn,
            } => {
                broadcast::push_room(
                    &registry,
                    &occupants,
                    &ServerMessage::GameMove {
                        board,
                        symbol: mark,
                        index,
                        next_turn,
                    },
                );
            }
            MoveOutcome::Finished {
                board,
                mark,
                next_turn,
                winner,
                winning_line,
                total_moves,
            } => {
                broadcast::push_room(
                    &registry,
                    &occupants,
                    &ServerMessage::GameMove {
                        board,
                        symbol: mark,
                        index,
                        next_turn,
                    },
                );
                broadcast::push_room(
                    &registry,
                    &occupants,
                    &ServerMessage::GameOver {
                        winner,
                        winning_line,
                        total_moves,
                    },
                );
            }
        }
    }

    async fn handle_chat(&self, conn: &ConnectionHandle, message: String) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };
        let Some(room) = self.current_room(&username).await else {
            return;
        };
        let occupants = {
            let guard = room.lock().await;
            if guard.seat_of(&username).is_none() {
                return;
            }
            guard.players().to_vec()
        };

        let registry = self.shared.registry.lock().await;
        broadcast::push_room(
            &registry,
            &occupants,
            &ServerMessage::ChatMessage { username, message },
        );
    }

    async fn handle_rematch(&self, conn: &ConnectionHandle) {
        let Some(username) = self.identity_of(conn).await else {
            return;
        };
        let Some(room) = self.current_room(&username).await else {
            return;
        };
        let occupants = {
            let mut guard = room.lock().await;
            if guard.seat_of(&username).is_none() {
                return;
            }
            // One request is enough: the rematch is auto-accepted.
            guard.reset_game();
            guard.players().to_vec()
        };
        info!(%username, "rematch accepted");

        let registry = self.shared.registry.lock().await;
        broadcast::push_room(
            &registry,
            &occupants,
            &ServerMessage::RematchRequest { accepted: true },
        );
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn identity_of(&self, conn: &ConnectionHandle) -> Option<PlayerName> {
        let registry = self.shared.registry.lock().await;
        let name = registry.lookup_by_connection(conn.id()).map(str::to_string);
        if name.is_none() {
            debug!(connection = %conn.id(), "message from unregistered connection");
        }
        name
    }

    async fn current_room(
        &self,
        username: &str,
    ) -> Option<Arc<Mutex<crate::room::Room>>> {
        let code = {
            let registry = self.shared.registry.lock().await;
            registry.binding(username).and_then(|b| b.room.clone())
        }?;
        self.shared.rooms.lock().await.get(&code)
    }

    /// Re-attach `username` to `code` if the room still seats it.
    async fn resume_room(&self, username: &str, code: &str) -> Option<ResumedRoom> {
        let room = self.shared.rooms.lock().await.get(code)?;
        let resumed = {
            let guard = room.lock().await;
            if guard.is_closed() {
                return None;
            }
            let symbol = guard.seat_of(username)?;
            ResumedRoom {
                id: guard.code().to_string(),
                symbol,
                player_x: guard.player_x().cloned().unwrap_or_default(),
                player_o: guard.player_o().cloned(),
                game_state: guard.state_payload(),
            }
        };
        self.shared
            .registry
            .lock()
            .await
            .set_room(username, Some(code.to_string()));
        Some(resumed)
    }

    /// Remove `username` from room `code`: notify the remaining
    /// occupant (whose board resets, with them promoted to X), delete
    /// the room if it emptied, clear the registry binding, and refresh
    /// the lobby's room listing.
    async fn leave_current_room(&self, username: &str, code: &str) {
        let room = self.shared.rooms.lock().await.get(code);
        let Some(room) = room else {
            self.shared.registry.lock().await.set_room(username, None);
            return;
        };

        let (removed, remaining) = {
            let mut guard = room.lock().await;
            let removed = guard.remove_player(username);
            (removed, guard.players().first().cloned())
        };
        if !removed {
            self.shared.registry.lock().await.set_room(username, None);
            return;
        }

        match remaining {
            Some(opponent) => {
                let registry = self.shared.registry.lock().await;
                broadcast::push_room(
                    &registry,
                    std::slice::from_ref(&opponent),
                    &ServerMessage::PlayerLeft {
                        player_name: username.to_string(),
                    },
                );
            }
            None => {
                self.shared.rooms.lock().await.remove_if_abandoned(code).await;
            }
        }

        let mut registry = self.shared.registry.lock().await;
        registry.set_room(username, None);
        let rooms = self.shared.rooms.lock().await;
        broadcast::push_rooms(&registry, &rooms).await;
    }

    /// Grace-window expiry: evict `username` unless a newer connection
    /// has re-attached in the meantime.
    async fn evict(&self, username: &str, stale: ConnectionId) {
        let room_code = {
            let mut registry = self.shared.registry.lock().await;
            // Only evict while the binding still points at the dead
            // connection; a quick reconnect wins.
            let still_stale = registry
                .binding(username)
                .is_some_and(|b| b.connection.id() == stale);
            if !still_stale {
                debug!(%username, "eviction skipped, identity re-attached");
                return;
            }
            let code = registry.binding(username).and_then(|b| b.room.clone());
            registry.unregister(username);
            code
        };
        info!(%username, "reconnect window expired, evicting");

        if let Some(code) = room_code {
            self.leave_current_room(username, &code).await;
        }
        let registry = self.shared.registry.lock().await;
        broadcast::push_players(&registry);
    }

    async fn cancel_eviction(&self, username: &str) {
        if let Some(task) = self.shared.evictions.lock().await.remove(username) {
            task.abort();
            debug!(%username, "cancelled pending eviction");
        }
    }
}

impl std::fmt::Debug for MatchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchServer")
            .field("grace_period", &self.shared.config.grace_period)
            .finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    async fn login(server: &MatchServer, name: &str) -> (ConnectionHandle, Outbox) {
        let (conn, mut outbox) = server.open_connection();
        server
            .handle_message(
                &conn,
                ClientMessage::Login {
                    username: name.into(),
                    reconnect: false,
                    room: None,
                },
            )
            .await;
        // Drain the login_success + lobby pushes.
        while outbox.try_recv().is_ok() {}
        (conn, outbox)
    }

    #[tokio::test]
    async fn messages_from_unregistered_connections_are_ignored() {
        let server = MatchServer::default();
        let (conn, mut outbox) = server.open_connection();

        server
            .handle_message(&conn, ClientMessage::CreateRoom)
            .await;

        assert!(outbox.try_recv().is_err());
        assert_eq!(server.room_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_text_is_dropped_and_connection_survives() {
        let server = MatchServer::default();
        let (conn, mut outbox) = server.open_connection();

        server.handle_text(&conn, "{not json").await;
        server.handle_text(&conn, r#"{"type":"warp_core_breach"}"#).await;
        assert!(outbox.try_recv().is_err());

        server
            .handle_text(&conn, r#"{"type":"login","username":"alice"}"#)
            .await;
        assert!(matches!(
            outbox.try_recv().unwrap(),
            ServerMessage::LoginSuccess { .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_login_is_rejected_with_the_wire_message() {
        let server = MatchServer::default();
        let (_alice, _rx) = login(&server, "alice").await;

        let (conn, mut outbox) = server.open_connection();
        server
            .handle_message(
                &conn,
                ClientMessage::Login {
                    username: "alice".into(),
                    reconnect: false,
                    room: None,
                },
            )
            .await;

        match outbox.try_recv().unwrap() {
            ServerMessage::LoginError { message } => {
                assert_eq!(message, "Username already taken");
            }
            other => panic!("expected login_error, got {other:?}"),
        }
        assert_eq!(server.registered_players().await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn joining_the_current_room_again_is_a_no_op() {
        let server = MatchServer::default();
        let (alice, mut alice_rx) = login(&server, "alice").await;

        server.handle_message(&alice, ClientMessage::CreateRoom).await;
        let code = match alice_rx.try_recv().unwrap() {
            ServerMessage::RoomCreated { room_id, .. } => room_id,
            other => panic!("expected room_created, got {other:?}"),
        };
        while alice_rx.try_recv().is_ok() {}

        server
            .handle_message(&alice, ClientMessage::JoinRoom { room_id: code })
            .await;

        assert!(alice_rx.try_recv().is_err());
        assert_eq!(server.room_count().await, 1);
    }

    #[tokio::test]
    async fn config_defaults_and_builder() {
        let config = ServerConfig::new();
        assert_eq!(config.grace_period, Duration::from_secs(30));

        let config = ServerConfig::new().with_grace_period(Duration::from_millis(250));
        assert_eq!(config.grace_period, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn debug_impl_names_the_server() {
        let server = MatchServer::default();
        let debug = format!("{server:?}");
        assert!(debug.contains("MatchServer"));
        assert!(debug.contains("grace_period"));
    }
}
