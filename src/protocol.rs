use crate::types::*;
use serde::{Deserialize, Serialize};

/// Reply text for frames that cannot be decoded
pub const MALFORMED_MESSAGE: &str = "Invalid message format";

/// Reply text for internal store faults
pub const INTERNAL_ERROR: &str = "Internal server error";

/// One inbound message per text frame, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join the room with this code. An empty code creates a new room.
    Join {
        #[serde(default)]
        room_code: String,
        username: String,
        color: Color,
    },
    /// Leave the current room. The connection's session is authoritative;
    /// the ids are informational.
    Leave {
        #[serde(default)]
        game_id: Option<RoomId>,
        #[serde(default)]
        player_id: Option<ParticipantId>,
    },
    Start {
        game_id: RoomId,
    },
    Move {
        game_id: RoomId,
        player_id: ParticipantId,
        position: Position,
    },
    CompleteTask {
        game_id: RoomId,
        player_id: ParticipantId,
    },
    CallMeeting {
        game_id: RoomId,
        player_id: ParticipantId,
    },
    Report {
        game_id: RoomId,
        player_id: ParticipantId,
        #[serde(default)]
        location: Option<Position>,
    },
    Chat {
        game_id: RoomId,
        player_id: ParticipantId,
        message: String,
    },
    CastVote {
        game_id: RoomId,
        player_id: ParticipantId,
        /// Absent or null is a skip
        #[serde(default)]
        target_id: Option<ParticipantId>,
    },
    Eliminate {
        game_id: RoomId,
        killer_id: ParticipantId,
        victim_id: ParticipantId,
    },
}

impl ClientMessage {
    /// Decode one text frame
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Tag name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Start { .. } => "start",
            Self::Move { .. } => "move",
            Self::CompleteTask { .. } => "complete-task",
            Self::CallMeeting { .. } => "call-meeting",
            Self::Report { .. } => "report",
            Self::Chat { .. } => "chat",
            Self::CastVote { .. } => "cast-vote",
            Self::Eliminate { .. } => "eliminate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Full room state, broadcast to every session in the room
    StateUpdate {
        game: Room,
        players: Vec<Participant>,
        chat_messages: Vec<ChatEntry>,
    },
    /// Sent only to the connection whose message failed
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<RoomSnapshot> for ServerMessage {
    fn from(snapshot: RoomSnapshot) -> Self {
        Self::StateUpdate {
            game: snapshot.room,
            players: snapshot.participants,
            chat_messages: snapshot.chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join() {
        let msg = ClientMessage::from_json_str(
            r#"{"type":"join","roomCode":"ABC123","username":"Alice","color":"red"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                room_code: "ABC123".to_string(),
                username: "Alice".to_string(),
                color: Color::Red,
            }
        );
    }

    #[test]
    fn test_parse_kebab_case_tags() {
        let msg = ClientMessage::from_json_str(
            r#"{"type":"complete-task","gameId":"g","playerId":"p"}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), "complete-task");

        let msg =
            ClientMessage::from_json_str(r#"{"type":"call-meeting","gameId":"g","playerId":"p"}"#)
                .unwrap();
        assert_eq!(msg.kind(), "call-meeting");
    }

    #[test]
    fn test_cast_vote_target_optional() {
        let skip =
            ClientMessage::from_json_str(r#"{"type":"cast-vote","gameId":"g","playerId":"p"}"#)
                .unwrap();
        assert!(matches!(
            skip,
            ClientMessage::CastVote {
                target_id: None,
                ..
            }
        ));

        let null_target = ClientMessage::from_json_str(
            r#"{"type":"cast-vote","gameId":"g","playerId":"p","targetId":null}"#,
        )
        .unwrap();
        assert!(matches!(
            null_target,
            ClientMessage::CastVote {
                target_id: None,
                ..
            }
        ));

        let vote = ClientMessage::from_json_str(
            r#"{"type":"cast-vote","gameId":"g","playerId":"p","targetId":"t"}"#,
        )
        .unwrap();
        assert!(matches!(
            vote,
            ClientMessage::CastVote { target_id: Some(ref t), .. } if t == "t"
        ));
    }

    #[test]
    fn test_parse_move_position() {
        let msg = ClientMessage::from_json_str(
            r#"{"type":"move","gameId":"g","playerId":"p","position":{"x":10.5,"y":20,"room":"medbay"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Move { position, .. } => {
                assert_eq!(position.x, 10.5);
                assert_eq!(position.y, 20.0);
                assert_eq!(position.room, "medbay");
            }
            other => panic!("Expected Move, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(ClientMessage::from_json_str("not json").is_err());
        assert!(ClientMessage::from_json_str(r#"{"type":"dance"}"#).is_err());
        // Unknown palette color
        assert!(ClientMessage::from_json_str(
            r#"{"type":"join","roomCode":"ABC123","username":"A","color":"teal"}"#
        )
        .is_err());
        // Missing required field
        assert!(ClientMessage::from_json_str(r#"{"type":"start"}"#).is_err());
    }

    #[test]
    fn test_error_shape() {
        let value = serde_json::to_value(ServerMessage::error("Game is full")).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "Game is full"}));
    }

    #[test]
    fn test_state_update_shape() {
        let room = Room {
            id: "g".to_string(),
            room_code: "ABC123".to_string(),
            host_id: Some("p".to_string()),
            state: RoomState::Lobby,
            settings: RoomSettings::default(),
            created_at: chrono::Utc::now(),
            phase_deadline: None,
            meeting: None,
            winner: None,
        };
        let player = Participant {
            id: "p".to_string(),
            room_id: "g".to_string(),
            username: "Alice".to_string(),
            color: Color::Blue,
            role: Role::Crewmate,
            is_alive: true,
            is_host: true,
            position: Position::spawn(),
            tasks_completed: 0,
            total_tasks: 7,
            has_voted: false,
            voted_for: None,
        };
        let msg = ServerMessage::from(RoomSnapshot {
            room,
            participants: vec![player],
            chat: vec![],
        });

        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["type"], "state-update");
        assert_eq!(value["game"]["roomCode"], "ABC123");
        assert_eq!(value["game"]["state"], "lobby");
        assert_eq!(value["game"]["settings"]["impostors"], 2);
        assert_eq!(value["game"]["settings"]["anonymousVotes"], true);
        assert_eq!(value["players"][0]["gameId"], "g");
        assert_eq!(value["players"][0]["isHost"], true);
        assert_eq!(value["players"][0]["color"], "blue");
        assert_eq!(value["players"][0]["position"]["room"], "central");
        assert_eq!(value["players"][0]["votedFor"], serde_json::Value::Null);
        assert!(value["chatMessages"].as_array().unwrap().is_empty());
    }
}
