#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the match server protocol.
//!
//! The JSON fixtures below are lifted from real client traffic: flat
//! objects tagged by `"type"`, camelCase payload fields, board cells
//! as `"X"` / `"O"` / `null`. Any drift here breaks deployed clients.

use noughts_server::protocol::{
    Board, ClientMessage, GameStatePayload, Mark, OpenRoom, ResumedRoom, ServerMessage, Winner,
};
use serde_json::json;

/// Serialize `val` to JSON, then deserialize back to `T` and return it.
fn round_trip<T: serde::Serialize + serde::de::DeserializeOwned>(val: &T) -> T {
    let json = serde_json::to_string(val).expect("serialize");
    serde_json::from_str(&json).expect("deserialize")
}

fn as_value<T: serde::Serialize>(val: &T) -> serde_json::Value {
    serde_json::to_value(val).expect("to_value")
}

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn login_fixture_parses() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"login","username":"Alice"}"#).expect("parse");
    match msg {
        ClientMessage::Login {
            username,
            reconnect,
            room,
        } => {
            assert_eq!(username, "Alice");
            assert!(!reconnect, "reconnect must default to false");
            assert!(room.is_none());
        }
        other => panic!("expected Login, got {other:?}"),
    }
}

#[test]
fn reconnect_login_fixture_parses() {
    let msg: ClientMessage = serde_json::from_str(
        r#"{"type":"login","username":"Alice","reconnect":true,"room":"ABC123"}"#,
    )
    .expect("parse");
    match msg {
        ClientMessage::Login {
            username,
            reconnect,
            room,
        } => {
            assert_eq!(username, "Alice");
            assert!(reconnect);
            assert_eq!(room.as_deref(), Some("ABC123"));
        }
        other => panic!("expected Login, got {other:?}"),
    }
}

#[test]
fn bare_message_fixtures_parse() {
    for (text, expected) in [
        (r#"{"type":"logout"}"#, "Logout"),
        (r#"{"type":"create_room"}"#, "CreateRoom"),
        (r#"{"type":"leave_room"}"#, "LeaveRoom"),
        (r#"{"type":"rematch_request"}"#, "RematchRequest"),
    ] {
        let msg: ClientMessage = serde_json::from_str(text).expect("parse");
        let name = format!("{msg:?}");
        assert!(name.starts_with(expected), "{text} parsed as {name}");
    }
}

#[test]
fn join_room_fixture_uses_camel_case_room_id() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"join_room","roomId":"XY7Q2Z"}"#).expect("parse");
    assert!(matches!(
        msg,
        ClientMessage::JoinRoom { room_id } if room_id == "XY7Q2Z"
    ));
}

#[test]
fn make_move_fixture_parses() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"make_move","index":4}"#).expect("parse");
    assert!(matches!(msg, ClientMessage::MakeMove { index: 4 }));
}

#[test]
fn chat_message_fixture_parses() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"chat_message","message":"good luck!"}"#).expect("parse");
    assert!(matches!(
        msg,
        ClientMessage::ChatMessage { message } if message == "good luck!"
    ));
}

#[test]
fn unknown_type_is_rejected() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>(r#"{"index":4}"#).is_err());
}

#[test]
fn negative_move_index_is_rejected() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"make_move","index":-1}"#).is_err());
}

// ════════════════════════════════════════════════════════════════════
// Outbound fixtures
// ════════════════════════════════════════════════════════════════════

fn sample_board() -> Board {
    let mut board: Board = [None; 9];
    board[0] = Some(Mark::X);
    board[4] = Some(Mark::O);
    board
}

#[test]
fn login_success_without_room_omits_the_field() {
    let msg = ServerMessage::LoginSuccess {
        username: "Alice".into(),
        room: None,
    };
    assert_eq!(
        as_value(&msg),
        json!({"type": "login_success", "username": "Alice"})
    );
}

#[test]
fn login_success_resume_matches_the_client_shape() {
    let msg = ServerMessage::LoginSuccess {
        username: "Alice".into(),
        room: Some(ResumedRoom {
            id: "ABC123".into(),
            symbol: Mark::X,
            player_x: "Alice".into(),
            player_o: Some("Bob".into()),
            game_state: GameStatePayload {
                board: sample_board(),
                current_turn: Mark::X,
                player_x: "Alice".into(),
                player_o: Some("Bob".into()),
                game_over: false,
                winner: None,
                winning_line: None,
            },
        }),
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "login_success",
            "username": "Alice",
            "room": {
                "id": "ABC123",
                "symbol": "X",
                "playerX": "Alice",
                "playerO": "Bob",
                "gameState": {
                    "board": ["X", null, null, null, "O", null, null, null, null],
                    "currentTurn": "X",
                    "playerX": "Alice",
                    "playerO": "Bob",
                    "gameOver": false,
                    "winner": null
                }
            }
        })
    );
}

#[test]
fn game_move_fixture_matches_the_client_shape() {
    let msg = ServerMessage::GameMove {
        board: sample_board(),
        symbol: Mark::O,
        index: 4,
        next_turn: Mark::X,
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "game_move",
            "board": ["X", null, null, null, "O", null, null, null, null],
            "symbol": "O",
            "index": 4,
            "nextTurn": "X"
        })
    );
}

#[test]
fn game_over_win_fixture_matches_the_client_shape() {
    let msg = ServerMessage::GameOver {
        winner: Winner::X,
        winning_line: Some([0, 1, 2]),
        total_moves: 5,
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "game_over",
            "winner": "X",
            "winningLine": [0, 1, 2],
            "totalMoves": 5
        })
    );
}

#[test]
fn game_over_draw_serializes_a_null_line() {
    let msg = ServerMessage::GameOver {
        winner: Winner::Draw,
        winning_line: None,
        total_moves: 9,
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "game_over",
            "winner": "draw",
            "winningLine": null,
            "totalMoves": 9
        })
    );
}

#[test]
fn room_created_fixture_matches_the_client_shape() {
    let msg = ServerMessage::RoomCreated {
        room_id: "XY7Q2Z".into(),
        symbol: Mark::X,
        player_x: "Alice".into(),
        player_o: None,
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "room_created",
            "roomId": "XY7Q2Z",
            "symbol": "X",
            "playerX": "Alice",
            "playerO": null
        })
    );
}

#[test]
fn rooms_update_fixture_matches_the_client_shape() {
    let msg = ServerMessage::RoomsUpdate {
        rooms: vec![OpenRoom {
            id: "XY7Q2Z".into(),
            players: vec!["Alice".into()],
            player_count: 1,
        }],
    };
    assert_eq!(
        as_value(&msg),
        json!({
            "type": "rooms_update",
            "rooms": [{"id": "XY7Q2Z", "players": ["Alice"], "playerCount": 1}]
        })
    );
}

#[test]
fn lobby_and_room_notifications_match_the_client_shape() {
    assert_eq!(
        as_value(&ServerMessage::PlayersUpdate {
            players: vec!["Alice".into(), "Bob".into()],
        }),
        json!({"type": "players_update", "players": ["Alice", "Bob"]})
    );
    assert_eq!(
        as_value(&ServerMessage::PlayerJoined {
            player_name: "Bob".into(),
            player_x: "Alice".into(),
            player_o: Some("Bob".into()),
        }),
        json!({
            "type": "player_joined",
            "playerName": "Bob",
            "playerX": "Alice",
            "playerO": "Bob"
        })
    );
    assert_eq!(
        as_value(&ServerMessage::GameStart {
            player_x: "Alice".into(),
            player_o: "Bob".into(),
        }),
        json!({"type": "game_start", "playerX": "Alice", "playerO": "Bob"})
    );
    assert_eq!(
        as_value(&ServerMessage::PlayerLeft {
            player_name: "Bob".into(),
        }),
        json!({"type": "player_left", "playerName": "Bob"})
    );
    assert_eq!(
        as_value(&ServerMessage::ChatMessage {
            username: "Alice".into(),
            message: "hi".into(),
        }),
        json!({"type": "chat_message", "username": "Alice", "message": "hi"})
    );
    assert_eq!(
        as_value(&ServerMessage::RematchRequest { accepted: true }),
        json!({"type": "rematch_request", "accepted": true})
    );
    assert_eq!(
        as_value(&ServerMessage::LoginError {
            message: "Username already taken".into(),
        }),
        json!({"type": "login_error", "message": "Username already taken"})
    );
    assert_eq!(
        as_value(&ServerMessage::RoomError {
            message: "Room is full".into(),
        }),
        json!({"type": "room_error", "message": "Room is full"})
    );
}

// ════════════════════════════════════════════════════════════════════
// Round trips
// ════════════════════════════════════════════════════════════════════

#[test]
fn server_messages_survive_a_round_trip() {
    let msg = ServerMessage::GameMove {
        board: sample_board(),
        symbol: Mark::X,
        index: 0,
        next_turn: Mark::O,
    };
    match round_trip(&msg) {
        ServerMessage::GameMove {
            board,
            symbol,
            index,
            next_turn,
        } => {
            assert_eq!(board, sample_board());
            assert_eq!(symbol, Mark::X);
            assert_eq!(index, 0);
            assert_eq!(next_turn, Mark::O);
        }
        other => panic!("expected GameMove, got {other:?}"),
    }
}

#[test]
fn winner_uses_uppercase_marks_and_lowercase_draw() {
    assert_eq!(as_value(&Winner::X), json!("X"));
    assert_eq!(as_value(&Winner::O), json!("O"));
    assert_eq!(as_value(&Winner::Draw), json!("draw"));
    assert_eq!(as_value(&Mark::X), json!("X"));
    assert_eq!(as_value(&Mark::O), json!("O"));
}
