//! Protocol message types.
//!
//! Every message is a JSON object tagged by its `type` field. Both directions
//! are strictly typed unions validated once at decode time; anything that
//! does not fit becomes a `Malformed` frame in the codec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color};
use crate::state::EndReason;

// ── Client → Server ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim a player slot under `username`.
    Register { username: String },

    /// Move a stone, 0-based `[row, col]`. `from == to` requests a pass.
    Move { from: [i64; 2], to: [i64; 2] },

    /// Explicit pass request.
    Pass,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register",
            ClientMessage::Move { .. } => "move",
            ClientMessage::Pass => "pass",
        }
    }
}

// ── Server → Client ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RegisterAck,

    RegisterNack {
        reason: String,
    },

    GameStart {
        players: [String; 2],
        /// Colors in the same order as `players`.
        colors: [Color; 2],
        first_player: String,
        board: Board,
    },

    YourTurn {
        board: Board,
        timeout_seconds: f64,
    },

    MoveOk {
        board: Board,
        next_player: String,
    },

    InvalidMove {
        board: Board,
        next_player: String,
        reason: String,
    },

    Pass {
        board: Board,
        next_player: String,
    },

    GameOver {
        board: Board,
        scores: BTreeMap<String, usize>,
        winner: Option<String>,
        draw: bool,
        reason: EndReason,
    },
}

impl ServerMessage {
    pub fn nack(reason: impl Into<String>) -> Self {
        ServerMessage::RegisterNack {
            reason: reason.into(),
        }
    }

    /// The board snapshot carried by this message, if any.
    pub fn board(&self) -> Option<&Board> {
        match self {
            ServerMessage::RegisterAck | ServerMessage::RegisterNack { .. } => None,
            ServerMessage::GameStart { board, .. }
            | ServerMessage::YourTurn { board, .. }
            | ServerMessage::MoveOk { board, .. }
            | ServerMessage::InvalidMove { board, .. }
            | ServerMessage::Pass { board, .. }
            | ServerMessage::GameOver { board, .. } => Some(board),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::RegisterAck => "register_ack",
            ServerMessage::RegisterNack { .. } => "register_nack",
            ServerMessage::GameStart { .. } => "game_start",
            ServerMessage::YourTurn { .. } => "your_turn",
            ServerMessage::MoveOk { .. } => "move_ok",
            ServerMessage::InvalidMove { .. } => "invalid_move",
            ServerMessage::Pass { .. } => "pass",
            ServerMessage::GameOver { .. } => "game_over",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Layout;
    use serde_json::json;

    #[test]
    fn register_wire_shape() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "register", "username": "alice"})).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Register {
                username: "alice".into()
            }
        );
    }

    #[test]
    fn move_ignores_extra_fields() {
        let msg: ClientMessage = serde_json::from_value(
            json!({"type": "move", "username": "alice", "from": [3, 3], "to": [3, 2]}),
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Move {
                from: [3, 3],
                to: [3, 2]
            }
        );
    }

    #[test]
    fn move_with_wrong_shape_fails() {
        let bad = json!({"type": "move", "from": [3], "to": [3, 2]});
        assert!(serde_json::from_value::<ClientMessage>(bad).is_err());
        let bad = json!({"type": "teleport"});
        assert!(serde_json::from_value::<ClientMessage>(bad).is_err());
    }

    #[test]
    fn ack_is_bare_type() {
        let json = serde_json::to_value(ServerMessage::RegisterAck).unwrap();
        assert_eq!(json, json!({"type": "register_ack"}));
    }

    #[test]
    fn game_over_wire_shape() {
        let mut scores = BTreeMap::new();
        scores.insert("alice".to_string(), 40);
        scores.insert("bob".to_string(), 24);
        let msg = ServerMessage::GameOver {
            board: Board::with_layout(Layout::Center),
            scores,
            winner: Some("alice".into()),
            draw: false,
            reason: EndReason::BoardSettled,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "game_over");
        assert_eq!(json["winner"], "alice");
        assert_eq!(json["scores"]["bob"], 24);
        assert_eq!(json["reason"], "board_settled");
        assert_eq!(json["board"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn board_bearing_messages() {
        assert!(ServerMessage::RegisterAck.board().is_none());
        assert!(ServerMessage::nack("x").board().is_none());
        let msg = ServerMessage::YourTurn {
            board: Board::empty(),
            timeout_seconds: 5.0,
        };
        assert!(msg.board().is_some());
        assert_eq!(msg.kind(), "your_turn");
    }
}
