//! Wire protocol between race clients and the coordinator.
//!
//! Frames are JSON objects tagged by a kebab-case `"type"` field with
//! camelCase payload fields. Inbound messages are decoded and structurally
//! validated here, before anything reaches room state.

use crate::{
    is_valid_room_code, GameState, ParticipantView, PassageType, RankedResult, RoomSettings,
    RoomView, SubmittedResult, TimeLimit, User, MAX_ROOM_CODE_LEN,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding or validating a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Partial settings update sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<TimeLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_type: Option<PassageType>,
}

/// Messages sent from a client to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_code: String, user: User },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_code: String },
    #[serde(rename_all = "camelCase")]
    ToggleReady { room_code: String },
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        room_code: String,
        settings: SettingsPatch,
    },
    #[serde(rename_all = "camelCase")]
    StartGame {
        room_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passage: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ProgressUpdate {
        room_code: String,
        progress: f64,
        wpm: u32,
        accuracy: f64,
    },
    #[serde(rename_all = "camelCase")]
    SubmitResult {
        room_code: String,
        result: SubmittedResult,
    },
    #[serde(rename_all = "camelCase")]
    ResetRoom { room_code: String },
}

impl ClientMessage {
    pub fn room_code(&self) -> &str {
        match self {
            ClientMessage::JoinRoom { room_code, .. }
            | ClientMessage::LeaveRoom { room_code }
            | ClientMessage::ToggleReady { room_code }
            | ClientMessage::UpdateSettings { room_code, .. }
            | ClientMessage::StartGame { room_code, .. }
            | ClientMessage::ProgressUpdate { room_code, .. }
            | ClientMessage::SubmitResult { room_code, .. }
            | ClientMessage::ResetRoom { room_code } => room_code,
        }
    }

    /// Short name used in logs, matching the wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::LeaveRoom { .. } => "leave-room",
            ClientMessage::ToggleReady { .. } => "toggle-ready",
            ClientMessage::UpdateSettings { .. } => "update-settings",
            ClientMessage::StartGame { .. } => "start-game",
            ClientMessage::ProgressUpdate { .. } => "progress-update",
            ClientMessage::SubmitResult { .. } => "submit-result",
            ClientMessage::ResetRoom { .. } => "reset-room",
        }
    }

    /// Structural checks only: ranges, required identifiers, code format.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !is_valid_room_code(self.room_code()) {
            return Err(ProtocolError::invalid(
                "roomCode",
                format!(
                    "expected 1-{} ASCII letters or digits",
                    MAX_ROOM_CODE_LEN
                ),
            ));
        }

        match self {
            ClientMessage::JoinRoom { user, .. } => {
                if user.id.trim().is_empty() {
                    return Err(ProtocolError::invalid("user.id", "must not be empty"));
                }
                if user.name.trim().is_empty() {
                    return Err(ProtocolError::invalid("user.name", "must not be empty"));
                }
            }
            ClientMessage::ProgressUpdate {
                progress, accuracy, ..
            } => {
                check_percentage("progress", *progress)?;
                check_percentage("accuracy", *accuracy)?;
            }
            ClientMessage::SubmitResult { result, .. } => {
                check_percentage("result.accuracy", result.accuracy)?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn check_percentage(field: &'static str, value: f64) -> Result<(), ProtocolError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ProtocolError::invalid(
            field,
            format!("{} is outside 0-100", value),
        ))
    }
}

/// Events sent from the coordinator to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    JoinedRoom { room_code: String, room: RoomView },
    #[serde(rename_all = "camelCase")]
    RoomUpdated {
        participants: Vec<ParticipantView>,
        settings: RoomSettings,
        game_state: GameState,
        host: User,
    },
    #[serde(rename_all = "camelCase")]
    SettingsUpdated { settings: RoomSettings },
    #[serde(rename_all = "camelCase")]
    GameStarting { passage: String },
    Countdown { n: u32 },
    #[serde(rename_all = "camelCase")]
    GameStarted { start_time: u64, time_limit: TimeLimit },
    #[serde(rename_all = "camelCase")]
    LiveUpdate {
        user_id: String,
        progress: f64,
        wpm: u32,
        accuracy: f64,
    },
    #[serde(rename_all = "camelCase")]
    GameFinished {
        results: Vec<RankedResult>,
        winner: Option<RankedResult>,
    },
    #[serde(rename_all = "camelCase")]
    RoomReset {
        participants: Vec<ParticipantView>,
        settings: RoomSettings,
        game_state: GameState,
    },
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::JoinedRoom { .. } => "joined-room",
            ServerEvent::RoomUpdated { .. } => "room-updated",
            ServerEvent::SettingsUpdated { .. } => "settings-updated",
            ServerEvent::GameStarting { .. } => "game-starting",
            ServerEvent::Countdown { .. } => "countdown",
            ServerEvent::GameStarted { .. } => "game-started",
            ServerEvent::LiveUpdate { .. } => "live-update",
            ServerEvent::GameFinished { .. } => "game-finished",
            ServerEvent::RoomReset { .. } => "room-reset",
            ServerEvent::Error { .. } => "error",
        }
    }
}

/// Decodes and validates an inbound frame.
pub fn decode_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let message: ClientMessage = serde_json::from_slice(data)?;
    message.validate()?;
    Ok(message)
}

pub fn encode_message(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_event(data: &[u8]) -> Result<ServerEvent, ProtocolError> {
    Ok(serde_json::from_slice(data)?)
}

pub fn encode_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_join_room() {
        let frame = br#"{"type":"join-room","roomCode":"ABC123","user":{"id":"u1","name":"Ada","imageUrl":"a.png"}}"#;
        let message = decode_message(frame).unwrap();

        match message {
            ClientMessage::JoinRoom { room_code, user } => {
                assert_eq!(room_code, "ABC123");
                assert_eq!(user.id, "u1");
                assert_eq!(user.image_url.as_deref(), Some("a.png"));
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_decode_start_game_without_passage() {
        let message = decode_message(br#"{"type":"start-game","roomCode":"ABC123"}"#).unwrap();
        assert_eq!(
            message,
            ClientMessage::StartGame {
                room_code: "ABC123".to_string(),
                passage: None,
            }
        );
    }

    #[test]
    fn test_decode_update_settings_partial() {
        let message = decode_message(
            br#"{"type":"update-settings","roomCode":"R1","settings":{"timeLimit":60}}"#,
        )
        .unwrap();

        match message {
            ClientMessage::UpdateSettings { settings, .. } => {
                assert_eq!(settings.time_limit, Some(TimeLimit::Sixty));
                assert_eq!(settings.passage_type, None);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_submit_result_defaults_char_counts() {
        let message = decode_message(
            br#"{"type":"submit-result","roomCode":"R1","result":{"wpm":70,"accuracy":96.5}}"#,
        )
        .unwrap();

        match message {
            ClientMessage::SubmitResult { result, .. } => {
                assert_eq!(result.wpm, 70);
                assert_eq!(result.total_chars, 0);
                assert_eq!(result.completed_at, None);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result = decode_message(br#"{"type":"progress-update","roomCode":"R1","progress":10}"#);
        assert!(matches!(result, Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = decode_message(br#"{"type":"fly","roomCode":"R1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_progress_is_rejected() {
        let result = decode_message(
            br#"{"type":"progress-update","roomCode":"R1","progress":140,"wpm":50,"accuracy":90}"#,
        );
        match result {
            Err(ProtocolError::InvalidField { field, .. }) => assert_eq!(field, "progress"),
            other => panic!("Expected invalid field, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_room_code_is_rejected() {
        let result = decode_message(br#"{"type":"toggle-ready","roomCode":""}"#);
        match result {
            Err(ProtocolError::InvalidField { field, .. }) => assert_eq!(field, "roomCode"),
            other => panic!("Expected invalid field, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_user_is_rejected() {
        let result = decode_message(
            br#"{"type":"join-room","roomCode":"R1","user":{"id":" ","name":"Ada"}}"#,
        );
        assert!(matches!(result, Err(ProtocolError::InvalidField { .. })));
    }

    #[test]
    fn test_event_wire_shape() {
        let json = encode_event(&ServerEvent::GameStarted {
            start_time: 1_700_000_000_000,
            time_limit: TimeLimit::Thirty,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "game-started");
        assert_eq!(value["startTime"], 1_700_000_000_000u64);
        assert_eq!(value["timeLimit"], 30);

        let countdown = encode_event(&ServerEvent::Countdown { n: 2 }).unwrap();
        assert_eq!(countdown, r#"{"type":"countdown","n":2}"#);
    }

    #[test]
    fn test_finished_without_winner_encodes_null() {
        let json = encode_event(&ServerEvent::GameFinished {
            results: vec![],
            winner: None,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["winner"].is_null());
        assert_eq!(decode_event(json.as_bytes()).unwrap().kind(), "game-finished");
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let message = ClientMessage::ResetRoom {
            room_code: "R1".to_string(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&encode_message(&message).unwrap()).unwrap();
        assert_eq!(value["type"], message.kind());
    }
}
