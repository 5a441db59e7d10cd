//! Rooms and their lifecycle.
//!
//! A [`Room`] owns its two ordered player slots (first occupant plays
//! X, second plays O, fixed for the room's lifetime), an embedded
//! [`Game`], and a spectator list that is reserved but never populated.
//! Rooms are held behind per-room mutexes inside a [`RoomDirectory`],
//! so unrelated rooms never contend on a shared lock.
//!
//! Deletion is guarded by a `closed` flag flipped under the room's own
//! lock: a task that cloned the room's `Arc` before the room emptied
//! out can never seat a player into, or move on, a dead room.

use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::engine::{self, MoveRejected, Outcome};
use crate::error::ServerError;
use crate::protocol::{Board, GameStatePayload, Mark, OpenRoom, PlayerName, RoomCode, Winner};

/// Characters a room code is drawn from.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a room code.
const CODE_LEN: usize = 6;

// ── Game ────────────────────────────────────────────────────────────

/// One game of tic-tac-toe inside a room. Board and turn only — seat
/// assignment lives in the room's slot order.
#[derive(Debug, Clone)]
pub struct Game {
    pub board: Board,
    pub current_turn: Mark,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub winning_line: Option<[usize; 3]>,
}

impl Game {
    /// An empty board with X to move.
    fn new() -> Self {
        Self {
            board: [None; 9],
            current_turn: Mark::X,
            game_over: false,
            winner: None,
            winning_line: None,
        }
    }
}

// ── Move results ────────────────────────────────────────────────────

/// Why a move was dropped. None of these reach the wire — they are
/// logged and swallowed, matching the base protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("mover is not seated in this room")]
    NotSeated,

    #[error("no opponent seated yet")]
    NoOpponent,

    #[error("game is already over")]
    GameOver,

    #[error(transparent)]
    Board(#[from] MoveRejected),
}

/// A successfully applied move.
#[derive(Debug, Clone)]
pub enum MoveOutcome {
    /// The game continues.
    Applied {
        board: Board,
        mark: Mark,
        next_turn: Mark,
    },
    /// This move ended the game.
    Finished {
        board: Board,
        mark: Mark,
        next_turn: Mark,
        winner: Winner,
        winning_line: Option<[usize; 3]>,
        total_moves: usize,
    },
}

// ── Room ────────────────────────────────────────────────────────────

/// A two-seat match context with its own isolated game state.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    /// Slot order is seat order: index 0 is X, index 1 is O.
    players: Vec<PlayerName>,
    /// Reserved for a future spectator mode; never populated.
    #[allow(dead_code)]
    spectators: Vec<PlayerName>,
    game: Game,
    closed: bool,
}

impl Room {
    fn new(code: RoomCode, owner: PlayerName) -> Self {
        Self {
            code,
            players: vec![owner],
            spectators: Vec::new(),
            game: Game::new(),
            closed: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn players(&self) -> &[PlayerName] {
        &self.players
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Joinable: exactly one occupant and not torn down.
    pub fn is_open(&self) -> bool {
        !self.closed && self.players.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The X seat's occupant. Present in any live room.
    pub fn player_x(&self) -> Option<&PlayerName> {
        self.players.first()
    }

    /// The O seat's occupant, once a second player has joined.
    pub fn player_o(&self) -> Option<&PlayerName> {
        self.players.get(1)
    }

    /// The mark assigned to `name` by slot position.
    pub fn seat_of(&self, name: &str) -> Option<Mark> {
        match self.players.iter().position(|p| p == name) {
            Some(0) => Some(Mark::X),
            Some(_) => Some(Mark::O),
            None => None,
        }
    }

    /// The other occupant, if both seats are filled.
    pub fn opponent_of(&self, name: &str) -> Option<&PlayerName> {
        self.players.iter().find(|p| *p != name)
    }

    /// Seat `name` into the O slot.
    ///
    /// # Errors
    ///
    /// [`ServerError::RoomNotFound`] if the room was torn down,
    /// [`ServerError::RoomFull`] if both seats are taken.
    pub fn join(&mut self, name: impl Into<PlayerName>) -> crate::error::Result<()> {
        if self.closed {
            return Err(ServerError::RoomNotFound);
        }
        if self.players.len() >= 2 {
            return Err(ServerError::RoomFull);
        }
        self.players.push(name.into());
        Ok(())
    }

    /// Remove `name` from its slot. Returns whether anything changed.
    /// When one occupant remains, the game resets with that occupant
    /// promoted to the X seat.
    pub fn remove_player(&mut self, name: &str) -> bool {
        let Some(pos) = self.players.iter().position(|p| p == name) else {
            return false;
        };
        self.players.remove(pos);
        if !self.players.is_empty() {
            self.game = Game::new();
        }
        true
    }

    /// Tear the room down. Must only be called once it is empty; the
    /// flag makes stale `Arc` holders see a dead room.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Fresh board, X to move. Seats keep their occupants.
    pub fn reset_game(&mut self) {
        self.game = Game::new();
    }

    /// Resolve `name` to its seat and apply the move.
    ///
    /// # Errors
    ///
    /// [`IllegalMove`] when the mover is not seated, has no opponent,
    /// the game is over, or the engine rejects the move.
    pub fn apply_move(&mut self, name: &str, index: usize) -> Result<MoveOutcome, IllegalMove> {
        if self.closed {
            return Err(IllegalMove::NotSeated);
        }
        let Some(mark) = self.seat_of(name) else {
            return Err(IllegalMove::NotSeated);
        };
        if self.players.len() < 2 {
            return Err(IllegalMove::NoOpponent);
        }
        if self.game.game_over {
            return Err(IllegalMove::GameOver);
        }

        let board = engine::apply(&self.game.board, index, mark, self.game.current_turn)?;
        self.game.board = board;
        self.game.current_turn = mark.opponent();

        match engine::evaluate(&board) {
            Outcome::InProgress => Ok(MoveOutcome::Applied {
                board,
                mark,
                next_turn: self.game.current_turn,
            }),
            Outcome::Win { mark: winner, line } => {
                self.game.game_over = true;
                self.game.winner = Some(winner.into());
                self.game.winning_line = Some(line);
                Ok(MoveOutcome::Finished {
                    board,
                    mark,
                    next_turn: self.game.current_turn,
                    winner: winner.into(),
                    winning_line: Some(line),
                    total_moves: engine::move_count(&board),
                })
            }
            Outcome::Draw => {
                self.game.game_over = true;
                self.game.winner = Some(Winner::Draw);
                Ok(MoveOutcome::Finished {
                    board,
                    mark,
                    next_turn: self.game.current_turn,
                    winner: Winner::Draw,
                    winning_line: None,
                    total_moves: engine::move_count(&board),
                })
            }
        }
    }

    /// Wire snapshot of the room's game, for reconnect resumes.
    pub fn state_payload(&self) -> GameStatePayload {
        GameStatePayload {
            board: self.game.board,
            current_turn: self.game.current_turn,
            player_x: self.player_x().cloned().unwrap_or_default(),
            player_o: self.player_o().cloned(),
            game_over: self.game.game_over,
            winner: self.game.winner,
            winning_line: self.game.winning_line,
        }
    }
}

// ── Directory ───────────────────────────────────────────────────────

/// All live rooms, keyed by code. The directory's own lock is held
/// only for lookups and inserts/removals; game state is mutated under
/// each room's private lock.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomCode, Arc<Mutex<Room>>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with `owner` in the X seat, under a fresh code.
    /// Collisions regenerate; the 36^6 code space makes exhaustion a
    /// non-concern.
    pub fn create(&mut self, owner: impl Into<PlayerName>) -> (RoomCode, Arc<Mutex<Room>>) {
        let code = loop {
            let candidate = generate_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Arc::new(Mutex::new(Room::new(code.clone(), owner.into())));
        self.rooms.insert(code.clone(), Arc::clone(&room));
        (code, room)
    }

    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Delete `code` if its room has no occupants. The emptiness check
    /// and the `closed` flip happen under the room's lock, so a join
    /// racing this call either seats first (room survives) or observes
    /// the closed flag and fails with room-not-found.
    pub async fn remove_if_abandoned(&mut self, code: &str) -> bool {
        let Some(room) = self.rooms.get(code).cloned() else {
            return false;
        };
        let mut guard = room.lock().await;
        if guard.is_empty() && !guard.is_closed() {
            guard.close();
            drop(guard);
            self.rooms.remove(code);
            return true;
        }
        false
    }

    /// Snapshot of every open (single-occupant) room, sorted by code
    /// for a stable lobby listing.
    pub async fn open_rooms(&self) -> Vec<OpenRoom> {
        let mut open = Vec::new();
        for room in self.rooms.values() {
            let guard = room.lock().await;
            if guard.is_open() {
                open.push(OpenRoom {
                    id: guard.code().to_string(),
                    players: guard.players().to_vec(),
                    player_count: guard.players().len(),
                });
            }
        }
        open.sort_by(|a, b| a.id.cmp(&b.id));
        open
    }
}

fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .filter_map(|_| CODE_ALPHABET.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
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

    fn two_player_room() -> Room {
        let mut room = Room::new("ABC123".into(), "alice".into());
        room.join("bob").unwrap();
        room
    }

    #[test]
    fn first_occupant_is_x_second_is_o() {
        let room = two_player_room();
        assert_eq!(room.seat_of("alice"), Some(Mark::X));
        assert_eq!(room.seat_of("bob"), Some(Mark::O));
        assert_eq!(room.seat_of("carol"), None);
    }

    #[test]
    fn join_rejects_third_player() {
        let mut room = two_player_room();
        let err = room.join("carol").unwrap_err();
        assert!(matches!(err, ServerError::RoomFull));
    }

    #[test]
    fn join_rejects_closed_room() {
        let mut room = Room::new("ABC123".into(), "alice".into());
        room.remove_player("alice");
        room.close();
        let err = room.join("bob").unwrap_err();
        assert!(matches!(err, ServerError::RoomNotFound));
    }

    #[test]
    fn remaining_player_becomes_x_on_a_fresh_board() {
        let mut room = two_player_room();
        room.apply_move("alice", 0).unwrap();

        assert!(room.remove_player("alice"));
        assert_eq!(room.seat_of("bob"), Some(Mark::X));
        assert_eq!(room.game().board, [None; 9]);
        assert_eq!(room.game().current_turn, Mark::X);
    }

    #[test]
    fn move_without_opponent_is_rejected() {
        let mut room = Room::new("ABC123".into(), "alice".into());
        let err = room.apply_move("alice", 0).unwrap_err();
        assert_eq!(err, IllegalMove::NoOpponent);
    }

    #[test]
    fn move_by_unseated_player_is_rejected() {
        let mut room = two_player_room();
        let err = room.apply_move("carol", 0).unwrap_err();
        assert_eq!(err, IllegalMove::NotSeated);
    }

    #[test]
    fn consecutive_moves_by_one_player_are_rejected() {
        let mut room = two_player_room();
        room.apply_move("alice", 0).unwrap();
        let err = room.apply_move("alice", 1).unwrap_err();
        assert_eq!(err, IllegalMove::Board(MoveRejected::NotYourTurn(Mark::X)));
    }

    #[test]
    fn winning_move_finishes_the_game_and_freezes_the_board() {
        let mut room = two_player_room();
        room.apply_move("alice", 0).unwrap();
        room.apply_move("bob", 3).unwrap();
        room.apply_move("alice", 1).unwrap();
        room.apply_move("bob", 4).unwrap();

        let outcome = room.apply_move("alice", 2).unwrap();
        match outcome {
            MoveOutcome::Finished {
                winner,
                winning_line,
                total_moves,
                ..
            } => {
                assert_eq!(winner, Winner::X);
                assert_eq!(winning_line, Some([0, 1, 2]));
                assert_eq!(total_moves, 5);
            }
            other => panic!("expected Finished, got {other:?}"),
        }

        assert!(room.game().game_over);
        let err = room.apply_move("bob", 5).unwrap_err();
        assert_eq!(err, IllegalMove::GameOver);
    }

    #[test]
    fn nine_legal_moves_with_no_line_end_in_a_draw() {
        let mut room = two_player_room();
        // X O X / X O O / O X X, interleaved legally.
        let moves = [
            ("alice", 0),
            ("bob", 1),
            ("alice", 2),
            ("bob", 4),
            ("alice", 3),
            ("bob", 5),
            ("alice", 7),
            ("bob", 6),
            ("alice", 8),
        ];
        let mut last = None;
        for (who, index) in moves {
            last = Some(room.apply_move(who, index).unwrap());
        }

        match last {
            Some(MoveOutcome::Finished {
                winner,
                winning_line,
                total_moves,
                ..
            }) => {
                assert_eq!(winner, Winner::Draw);
                assert_eq!(winning_line, None);
                assert_eq!(total_moves, 9);
            }
            other => panic!("expected a finished draw, got {other:?}"),
        }
        assert!(room.game().game_over);
        assert_eq!(room.game().winner, Some(Winner::Draw));
    }

    #[test]
    fn rematch_resets_board_but_keeps_seats() {
        let mut room = two_player_room();
        room.apply_move("alice", 0).unwrap();
        room.reset_game();

        assert_eq!(room.game().board, [None; 9]);
        assert_eq!(room.game().current_turn, Mark::X);
        assert!(!room.game().game_over);
        assert_eq!(room.seat_of("alice"), Some(Mark::X));
        assert_eq!(room.seat_of("bob"), Some(Mark::O));
    }

    #[test]
    fn generated_codes_use_the_expected_alphabet() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn directory_create_produces_unique_codes() {
        let mut dir = RoomDirectory::new();
        let mut codes = std::collections::HashSet::new();
        for i in 0..64 {
            let (code, _) = dir.create(format!("p{i}"));
            assert!(codes.insert(code));
        }
        assert_eq!(dir.len(), 64);
    }

    #[tokio::test]
    async fn remove_if_abandoned_spares_occupied_rooms() {
        let mut dir = RoomDirectory::new();
        let (code, room) = dir.create("alice");

        assert!(!dir.remove_if_abandoned(&code).await);

        room.lock().await.remove_player("alice");
        assert!(dir.remove_if_abandoned(&code).await);
        assert!(dir.get(&code).is_none());
        assert!(room.lock().await.is_closed());
    }

    #[tokio::test]
    async fn open_rooms_lists_only_single_occupant_rooms() {
        let mut dir = RoomDirectory::new();
        let (open_code, _) = dir.create("alice");
        let (full_code, full_room) = dir.create("bob");
        full_room.lock().await.join("carol").unwrap();

        let open = dir.open_rooms().await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, open_code);
        assert_eq!(open[0].players, vec!["alice".to_string()]);
        assert_eq!(open[0].player_count, 1);
        assert_ne!(open[0].id, full_code);
    }
}
