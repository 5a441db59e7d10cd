//! Connection registry: display name → live connection + current room.
//!
//! The registry is plain data — callers serialize access through the
//! coordinator's mutex. It maintains a reverse `ConnectionId → name`
//! map in lockstep with the forward map so that transport close events
//! (which carry only the connection) resolve in O(1).

use std::collections::HashMap;

use crate::error::ServerError;
use crate::protocol::{PlayerName, RoomCode};
use crate::transport::{ConnectionHandle, ConnectionId};

/// What the registry knows about one registered identity.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The most recent live connection for this identity.
    pub connection: ConnectionHandle,
    /// The room this identity currently occupies, if any.
    pub room: Option<RoomCode>,
}

/// Identity bookkeeping for every registered player.
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<PlayerName, Binding>,
    by_connection: HashMap<ConnectionId, PlayerName>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NameTaken`] if the name is already bound.
    pub fn register(
        &mut self,
        name: impl Into<PlayerName>,
        connection: ConnectionHandle,
    ) -> crate::error::Result<()> {
        let name = name.into();
        if self.players.contains_key(&name) {
            return Err(ServerError::NameTaken);
        }
        self.by_connection.insert(connection.id(), name.clone());
        self.players.insert(
            name,
            Binding {
                connection,
                room: None,
            },
        );
        Ok(())
    }

    /// Replace the stored connection for an existing identity. Room
    /// membership is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownPlayer`] if the name is not bound.
    pub fn reconnect(
        &mut self,
        name: &str,
        connection: ConnectionHandle,
    ) -> crate::error::Result<()> {
        let Some(binding) = self.players.get_mut(name) else {
            return Err(ServerError::UnknownPlayer(name.to_string()));
        };
        self.by_connection.remove(&binding.connection.id());
        self.by_connection.insert(connection.id(), name.to_string());
        binding.connection = connection;
        Ok(())
    }

    /// Drop an identity and its reverse mapping. Idempotent.
    pub fn unregister(&mut self, name: &str) {
        if let Some(binding) = self.players.remove(name) {
            self.by_connection.remove(&binding.connection.id());
        }
    }

    /// Resolve a transport close event to the identity it belonged to.
    pub fn lookup_by_connection(&self, id: ConnectionId) -> Option<&str> {
        self.by_connection.get(&id).map(String::as_str)
    }

    /// Snapshot of every registered name.
    pub fn all_identities(&self) -> Vec<PlayerName> {
        self.players.keys().cloned().collect()
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.players.get(name)
    }

    /// Point an identity at a room (or back at the lobby with `None`).
    pub fn set_room(&mut self, name: &str, room: Option<RoomCode>) {
        if let Some(binding) = self.players.get_mut(name) {
            binding.room = room;
        }
    }

    /// The live connection for an identity, looked up fresh so pushes
    /// always reach the newest connection after a reconnect.
    pub fn connection_of(&self, name: &str) -> Option<&ConnectionHandle> {
        self.players.get(name).map(|b| &b.connection)
    }

    /// Connections of every identity not currently seated in a room.
    pub fn lobby_connections(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.players
            .values()
            .filter(|b| b.room.is_none())
            .map(|b| &b.connection)
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

    fn conn() -> ConnectionHandle {
        ConnectionHandle::new_pair().0
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let mut reg = Registry::new();
        reg.register("alice", conn()).unwrap();
        let err = reg.register("alice", conn()).unwrap_err();
        assert!(matches!(err, ServerError::NameTaken));
    }

    #[test]
    fn register_maintains_reverse_map() {
        let mut reg = Registry::new();
        let c = conn();
        let id = c.id();
        reg.register("alice", c).unwrap();
        assert_eq!(reg.lookup_by_connection(id), Some("alice"));
    }

    #[test]
    fn reconnect_replaces_handle_and_keeps_room() {
        let mut reg = Registry::new();
        let old = conn();
        let old_id = old.id();
        reg.register("alice", old).unwrap();
        reg.set_room("alice", Some("ABC123".into()));

        let new = conn();
        let new_id = new.id();
        reg.reconnect("alice", new).unwrap();

        assert_eq!(reg.lookup_by_connection(old_id), None);
        assert_eq!(reg.lookup_by_connection(new_id), Some("alice"));
        assert_eq!(
            reg.binding("alice").unwrap().room.as_deref(),
            Some("ABC123")
        );
    }

    #[test]
    fn reconnect_unknown_name_fails() {
        let mut reg = Registry::new();
        let err = reg.reconnect("ghost", conn()).unwrap_err();
        assert!(matches!(err, ServerError::UnknownPlayer(_)));
    }

    #[test]
    fn unregister_is_idempotent_and_clears_reverse_map() {
        let mut reg = Registry::new();
        let c = conn();
        let id = c.id();
        reg.register("alice", c).unwrap();

        reg.unregister("alice");
        reg.unregister("alice");

        assert!(reg.binding("alice").is_none());
        assert_eq!(reg.lookup_by_connection(id), None);
        assert!(reg.all_identities().is_empty());
    }

    #[test]
    fn lobby_connections_skip_seated_players() {
        let mut reg = Registry::new();
        reg.register("alice", conn()).unwrap();
        reg.register("bob", conn()).unwrap();
        reg.set_room("alice", Some("ROOM01".into()));

        let lobby: Vec<_> = reg.lobby_connections().collect();
        assert_eq!(lobby.len(), 1);
        assert_eq!(
            lobby[0].id(),
            reg.connection_of("bob").unwrap().id()
        );
    }
}
