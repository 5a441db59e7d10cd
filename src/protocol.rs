//! Wire-compatible protocol types for the match server.
//!
//! Every type in this module produces the exact JSON the browser client
//! speaks: messages are flat objects tagged by a `"type"` field
//! (snake_case), with camelCase payload fields (`roomId`, `playerX`,
//! `nextTurn`, …). Board cells serialize as `"X"`, `"O"`, or `null`.

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Display name identifying one connected player.
pub type PlayerName = String;

/// Six-character room code drawn from `A-Z0-9`.
pub type RoomCode = String;

// ── Enums ───────────────────────────────────────────────────────────

/// A player's mark on the board. The first occupant of a room always
/// plays X, the second O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The mark that moves after this one.
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Result of a finished game as reported in `game_over`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Mark> for Winner {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Winner::X,
            Mark::O => Winner::O,
        }
    }
}

// ── Payload structs ─────────────────────────────────────────────────

/// A single board cell: empty, or claimed by a mark.
pub type Cell = Option<Mark>;

/// The 9-cell board in row-major order.
pub type Board = [Cell; 9];

/// Snapshot of a room's game, as embedded in `login_success` when a
/// reconnecting client resumes a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub board: Board,
    pub current_turn: Mark,
    pub player_x: PlayerName,
    pub player_o: Option<PlayerName>,
    pub game_over: bool,
    pub winner: Option<Winner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_line: Option<[usize; 3]>,
}

/// Room payload carried by `login_success` on a successful resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumedRoom {
    pub id: RoomCode,
    pub symbol: Mark,
    pub player_x: PlayerName,
    pub player_o: Option<PlayerName>,
    pub game_state: GameStatePayload,
}

/// One joinable room in the lobby's `rooms_update` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoom {
    pub id: RoomCode,
    pub players: Vec<PlayerName>,
    pub player_count: usize,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register a display name (MUST precede any other message).
    /// With `reconnect: true` the uniqueness check is skipped and the
    /// remembered `room` code, if any, is used to resume a match.
    Login {
        username: PlayerName,
        #[serde(default)]
        reconnect: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomCode>,
    },
    /// Release the display name and leave any room.
    Logout,
    /// Create a fresh room and take the X seat.
    CreateRoom,
    /// Join an open room by code, taking the O seat.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomCode },
    /// Leave the current room.
    LeaveRoom,
    /// Claim a board cell (0–8, row-major).
    MakeMove { index: usize },
    /// Send a chat line to the room.
    ChatMessage { message: String },
    /// Reset the room's board for another game.
    RematchRequest,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Login accepted. `room` is present only when a reconnecting
    /// client was re-seated into its previous room.
    LoginSuccess {
        username: PlayerName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<ResumedRoom>,
    },
    /// Login rejected (name already taken).
    LoginError { message: String },
    /// Current roster of registered players (lobby clients only).
    PlayersUpdate { players: Vec<PlayerName> },
    /// Current open-room listing (lobby clients only).
    RoomsUpdate { rooms: Vec<OpenRoom> },
    /// Room created; the sender holds the X seat.
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: RoomCode,
        symbol: Mark,
        player_x: PlayerName,
        player_o: Option<PlayerName>,
    },
    /// Join failed (room not found, or full).
    RoomError { message: String },
    /// Join succeeded; the sender holds the O seat.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomCode,
        symbol: Mark,
        player_x: PlayerName,
        player_o: Option<PlayerName>,
    },
    /// Sent to the seated player when an opponent joins.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_name: PlayerName,
        player_x: PlayerName,
        player_o: Option<PlayerName>,
    },
    /// Both seats are filled; play begins with X.
    #[serde(rename_all = "camelCase")]
    GameStart {
        player_x: PlayerName,
        player_o: PlayerName,
    },
    /// The named occupant left the room.
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_name: PlayerName },
    /// A move was applied to the room's board.
    #[serde(rename_all = "camelCase")]
    GameMove {
        board: Board,
        symbol: Mark,
        index: usize,
        next_turn: Mark,
    },
    /// The game ended. `winning_line` is `null` on a draw.
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner: Winner,
        winning_line: Option<[usize; 3]>,
        total_moves: usize,
    },
    /// A chat line, echoed to every occupant including the sender.
    ChatMessage {
        username: PlayerName,
        message: String,
    },
    /// A rematch was requested and (unconditionally) accepted.
    RematchRequest { accepted: bool },
}
