use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomId = String;
pub type ParticipantId = String;
pub type ChatEntryId = String;
pub type BallotId = String;

/// Session IDs identify one live connection
pub type SessionId = String;

pub const MAX_PARTICIPANTS: usize = 10;
pub const MIN_PARTICIPANTS_TO_START: usize = 4;
pub const ROOM_CODE_LENGTH: usize = 6;
pub const MAX_USERNAME_CHARS: usize = 20;
pub const MAX_CHAT_CHARS: usize = 200;
pub const DEFAULT_TOTAL_TASKS: u32 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Lobby,
    Playing,
    Voting,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Crewmate,
    Impostor,
}

/// Which side took the round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Crewmates,
    Impostors,
}

/// The fixed palette. Colors are unique within a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Pink,
    Orange,
    White,
    Black,
    Brown,
}

impl Color {
    pub const ALL: [Color; 10] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
        Color::Pink,
        Color::Orange,
        Color::White,
        Color::Black,
        Color::Brown,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub impostors: usize,
    /// Seconds of discussion before voting opens
    pub discussion_time: u32,
    /// Seconds allowed for voting
    pub voting_time: u32,
    pub anonymous_votes: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            impostors: 2,
            discussion_time: 45,
            voting_time: 120,
            anonymous_votes: true,
        }
    }
}

/// A 2-D map position plus the zone label it falls in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub room: String,
}

impl Position {
    /// Where new participants appear
    pub fn spawn() -> Self {
        Self {
            x: 300.0,
            y: 300.0,
            room: "central".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeetingKind {
    Emergency,
    Report,
}

/// The meeting that opened the current voting phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub caller_id: ParticipantId,
    pub kind: MeetingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Position>,
}

/// One game instance. Serialized as `game` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub room_code: String,
    pub host_id: Option<ParticipantId>,
    pub state: RoomState,
    pub settings: RoomSettings,
    pub created_at: DateTime<Utc>,
    /// Voting closes at this instant when phase timers are enforced
    pub phase_deadline: Option<DateTime<Utc>>,
    pub meeting: Option<Meeting>,
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(rename = "gameId")]
    pub room_id: RoomId,
    pub username: String,
    pub color: Color,
    pub role: Role,
    pub is_alive: bool,
    pub is_host: bool,
    pub position: Position,
    pub tasks_completed: u32,
    pub total_tasks: u32,
    pub has_voted: bool,
    /// `None` is a skip (or no vote yet)
    pub voted_for: Option<ParticipantId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: ChatEntryId,
    #[serde(rename = "gameId")]
    pub room_id: RoomId,
    #[serde(rename = "playerId")]
    pub author_id: ParticipantId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: BallotId,
    #[serde(rename = "gameId")]
    pub room_id: RoomId,
    pub voter_id: ParticipantId,
    /// `None` is a skip ballot
    pub target_id: Option<ParticipantId>,
    pub timestamp: DateTime<Utc>,
}

/// Input for creating a room; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub room_code: String,
    pub settings: RoomSettings,
}

/// Input for creating a participant; role, vote state and task progress start at their defaults
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub room_id: RoomId,
    pub username: String,
    pub color: Color,
    pub is_host: bool,
    pub total_tasks: u32,
    pub position: Position,
}

/// Full room snapshot pushed to every session of the room
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room: Room,
    pub participants: Vec<Participant>,
    pub chat: Vec<ChatEntry>,
}
