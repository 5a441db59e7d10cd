//! Lobby-wide and room-scoped push notifications.
//!
//! All pushes are best-effort, fire-and-forget channel writes: a slow
//! or dead consumer is never waited on. Lobby churn (`players_update`,
//! `rooms_update`) goes only to registered connections that are not
//! seated in a room; room pushes resolve each occupant's connection
//! freshly through the registry so they reach the newest connection
//! after a reconnect.

use crate::protocol::{PlayerName, ServerMessage};
use crate::registry::Registry;
use crate::room::RoomDirectory;

/// Build the current `players_update` roster, sorted for stable output.
pub(crate) fn players_message(registry: &Registry) -> ServerMessage {
    let mut players = registry.all_identities();
    players.sort();
    ServerMessage::PlayersUpdate { players }
}

/// Push the player roster to every connection still in the lobby.
pub(crate) fn push_players(registry: &Registry) {
    let msg = players_message(registry);
    for conn in registry.lobby_connections() {
        conn.send(msg.clone());
    }
}

/// Push the open-room listing to every connection still in the lobby.
pub(crate) async fn push_rooms(registry: &Registry, rooms: &RoomDirectory) {
    let msg = ServerMessage::RoomsUpdate {
        rooms: rooms.open_rooms().await,
    };
    for conn in registry.lobby_connections() {
        conn.send(msg.clone());
    }
}

/// Push `msg` to each named occupant of a room.
pub(crate) fn push_room(registry: &Registry, occupants: &[PlayerName], msg: &ServerMessage) {
    for name in occupants {
        if let Some(conn) = registry.connection_of(name) {
            conn.send(msg.clone());
        }
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
    use crate::transport::ConnectionHandle;

    #[test]
    fn lobby_pushes_skip_seated_players() {
        let mut registry = Registry::new();
        let (lobby_conn, mut lobby_rx) = ConnectionHandle::new_pair();
        let (seated_conn, mut seated_rx) = ConnectionHandle::new_pair();
        registry.register("lobby", lobby_conn).unwrap();
        registry.register("seated", seated_conn).unwrap();
        registry.set_room("seated", Some("ABC123".into()));

        push_players(&registry);

        let msg = lobby_rx.try_recv().unwrap();
        match msg {
            ServerMessage::PlayersUpdate { players } => {
                assert_eq!(players, vec!["lobby".to_string(), "seated".to_string()]);
            }
            other => panic!("expected players_update, got {other:?}"),
        }
        assert!(seated_rx.try_recv().is_err());
    }

    #[test]
    fn room_push_reaches_every_occupant() {
        let mut registry = Registry::new();
        let (a, mut a_rx) = ConnectionHandle::new_pair();
        let (b, mut b_rx) = ConnectionHandle::new_pair();
        registry.register("alice", a).unwrap();
        registry.register("bob", b).unwrap();

        let occupants = vec!["alice".to_string(), "bob".to_string()];
        push_room(
            &registry,
            &occupants,
            &ServerMessage::RematchRequest { accepted: true },
        );

        assert!(matches!(
            a_rx.try_recv().unwrap(),
            ServerMessage::RematchRequest { accepted: true }
        ));
        assert!(matches!(
            b_rx.try_recv().unwrap(),
            ServerMessage::RematchRequest { accepted: true }
        ));
    }

    #[test]
    fn push_to_dropped_outbox_is_silently_skipped() {
        let mut registry = Registry::new();
        let (conn, rx) = ConnectionHandle::new_pair();
        registry.register("alice", conn).unwrap();
        drop(rx);

        // Must not panic or error.
        push_players(&registry);
    }
}
