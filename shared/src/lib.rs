//! Types shared between the race coordinator and its clients.
//!
//! Everything that crosses the wire lives here: the closed set of client
//! messages and server events, the room and participant views they carry, and
//! the pure ranking and typing-stat helpers both sides agree on.

pub mod protocol;
pub mod ranking;

pub use protocol::{
    decode_event, decode_message, encode_event, encode_message, ClientMessage, ProtocolError,
    ServerEvent, SettingsPatch,
};
pub use ranking::{rank_results, TypingStats};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// First value announced by the pre-race countdown.
pub const COUNTDOWN_FROM: u32 = 3;
/// Interval between countdown ticks.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
/// Extra time after the time limit before a race is force-finished.
pub const FINISH_GRACE: Duration = Duration::from_secs(2);
pub const MAX_ROOM_CODE_LEN: usize = 16;

/// Identity of a player as supplied by the client at join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: None,
        }
    }
}

/// Server-assigned identity of one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Race duration. Only the lengths offered by the room UI are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeLimit {
    #[default]
    Thirty,
    Sixty,
}

impl TimeLimit {
    pub fn as_secs(self) -> u32 {
        match self {
            TimeLimit::Thirty => 30,
            TimeLimit::Sixty => 60,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(u64::from(self.as_secs()))
    }
}

impl TryFrom<u32> for TimeLimit {
    type Error = String;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        match secs {
            30 => Ok(TimeLimit::Thirty),
            60 => Ok(TimeLimit::Sixty),
            other => Err(format!("unsupported time limit {}s (expected 30 or 60)", other)),
        }
    }
}

impl From<TimeLimit> for u32 {
    fn from(limit: TimeLimit) -> Self {
        limit.as_secs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageType {
    #[default]
    Text,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub time_limit: TimeLimit,
    pub passage_type: PassageType,
}

impl RoomSettings {
    /// Applies the fields present in `patch`, leaving the others untouched.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(time_limit) = patch.time_limit {
            self.time_limit = time_limit;
        }
        if let Some(passage_type) = patch.passage_type {
            self.passage_type = passage_type;
        }
    }
}

/// Room lifecycle: `Waiting -> Countdown -> Active -> Finished -> Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    #[default]
    Waiting,
    Countdown,
    Active,
    Finished,
}

/// A participant as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    #[serde(flatten)]
    pub user: User,
    pub connection_id: ConnectionId,
    pub is_ready: bool,
    pub progress: f64,
    pub current_wpm: u32,
    pub current_accuracy: f64,
}

/// Full room snapshot sent to a player right after joining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub code: String,
    pub host: User,
    pub participants: Vec<ParticipantView>,
    pub settings: RoomSettings,
    pub game_state: GameState,
    pub passage: String,
    pub start_time: Option<u64>,
}

/// Final numbers reported by a client when it finishes the passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResult {
    pub wpm: u32,
    pub accuracy: f64,
    #[serde(default)]
    pub correct_chars: u32,
    #[serde(default)]
    pub incorrect_chars: u32,
    #[serde(default)]
    pub total_chars: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

/// One row of the final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub user_id: String,
    pub name: String,
    pub wpm: u32,
    pub accuracy: f64,
    pub correct_chars: u32,
    pub incorrect_chars: u32,
    pub total_chars: u32,
    pub completed_at: u64,
    pub position: u32,
}

/// Checks the room code format: 1 to 16 ASCII letters or digits.
pub fn is_valid_room_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_ROOM_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
