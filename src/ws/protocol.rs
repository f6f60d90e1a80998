//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the court a player occupies.
/// Assigned once at pairing and fixed for the match's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Left side, defends the x = 0 edge
    #[serde(rename = "player_1")]
    Player1,
    /// Right side, defends the x = 100 edge
    #[serde(rename = "player_2")]
    Player2,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player1 => Side::Player2,
            Side::Player2 => Side::Player1,
        }
    }

    /// Array index for per-side state ([0] = player_1, [1] = player_2)
    pub fn index(self) -> usize {
        match self {
            Side::Player1 => 0,
            Side::Player2 => 1,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Paddle position for the sender's side
    Move {
        /// Target vertical position, clamped server-side to [0, 100]
        y_position: f32,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// An opponent was found and a match created
    MatchFound {
        /// Match id, used as the routing and persistence key
        room: Uuid,
        /// Which side the recipient plays
        role: Side,
    },

    /// Full authoritative state, broadcast every tick
    StateUpdate { data: StateSnapshot },

    /// A point was scored
    ScoreUpdate { score: ScorePair },

    /// Terminal event, sent exactly once per match
    MatchEnd {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        final_score: Option<ScorePair>,
    },

    /// Error report for the offending connection only
    Error { message: String },
}

/// Score counters, one per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    pub p1: u32,
    pub p2: u32,
}

/// Ball state in a snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    /// Direction unit vector
    pub dx: f32,
    pub dy: f32,
    /// Scalar speed in court units per tick
    pub speed: f32,
}

/// Paddle positions in a snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaddlePair {
    pub p1_y: f32,
    pub p2_y: f32,
}

/// Full game state broadcast to both sides
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub ball: BallSnapshot,
    pub paddles: PaddlePair,
    pub score: ScorePair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_message_parses_from_wire_format() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"move","y_position":42.5}"#).expect("valid frame");
        let ClientMsg::Move { y_position } = msg;
        assert_eq!(y_position, 42.5);
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let result = serde_json::from_str::<ClientMsg>(r#"{"type":"teleport","y_position":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_field_is_rejected() {
        let result = serde_json::from_str::<ClientMsg>(r#"{"type":"move"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn match_found_serializes_role_strings() {
        let id = Uuid::new_v4();
        let msg = ServerMsg::MatchFound {
            room: id,
            role: Side::Player1,
        };
        let value = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(value["type"], "match_found");
        assert_eq!(value["room"], id.to_string());
        assert_eq!(value["role"], "player_1");

        let msg = ServerMsg::MatchFound {
            room: id,
            role: Side::Player2,
        };
        let value = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(value["role"], "player_2");
    }

    #[test]
    fn match_end_omits_absent_fields() {
        let msg = ServerMsg::MatchEnd {
            message: "Game over".to_string(),
            winner: None,
            final_score: None,
        };
        let value = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(value["type"], "match_end");
        assert!(value.get("winner").is_none());
        assert!(value.get("final_score").is_none());
    }

    #[test]
    fn score_update_wire_shape() {
        let msg = ServerMsg::ScoreUpdate {
            score: ScorePair { p1: 2, p2: 1 },
        };
        let value = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(value["type"], "score_update");
        assert_eq!(value["score"]["p1"], 2);
        assert_eq!(value["score"]["p2"], 1);
    }

    #[test]
    fn sides_are_complementary() {
        assert_eq!(Side::Player1.opponent(), Side::Player2);
        assert_eq!(Side::Player2.opponent(), Side::Player1);
        assert_ne!(Side::Player1.index(), Side::Player2.index());
    }
}
