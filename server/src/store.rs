//! Persistence collaborator.
//!
//! The coordinator only needs two things from storage: to confirm a room
//! code exists before anyone joins it, and to record the standings of a
//! finished race. Saves are fire-and-forget from the room's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{PassageType, RankedResult, TimeLimit};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("rejected record for room {room_code}: {reason}")]
    Rejected { room_code: String, reason: String },
}

/// Everything persisted about one finished race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionRecord {
    pub room_code: String,
    pub passage: String,
    pub time_limit: TimeLimit,
    pub passage_type: PassageType,
    pub started_at: Option<u64>,
    pub completed_at: u64,
    pub winner_id: Option<String>,
    pub results: Vec<RankedResult>,
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn room_exists(&self, code: &str) -> Result<bool, StoreError>;

    async fn save_competition(&self, record: CompetitionRecord) -> Result<(), StoreError>;
}

/// In-process store.
///
/// An *open* store treats every code as existing; a seeded one only knows
/// the codes it was built with.
pub struct MemoryStore {
    known_rooms: Option<HashSet<String>>,
    competitions: Mutex<Vec<CompetitionRecord>>,
}

impl MemoryStore {
    pub fn open() -> Self {
        Self {
            known_rooms: None,
            competitions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rooms<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_rooms: Some(codes.into_iter().map(Into::into).collect()),
            competitions: Mutex::new(Vec::new()),
        }
    }

    /// Records saved so far, oldest first.
    pub fn competitions(&self) -> Vec<CompetitionRecord> {
        match self.competitions.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn room_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self
            .known_rooms
            .as_ref()
            .map_or(true, |rooms| rooms.contains(code)))
    }

    async fn save_competition(&self, record: CompetitionRecord) -> Result<(), StoreError> {
        if record.results.is_empty() {
            return Err(StoreError::Rejected {
                room_code: record.room_code,
                reason: "no results".to_string(),
            });
        }

        let mut competitions = self
            .competitions
            .lock()
            .map_err(|_| StoreError::Unavailable("competition log poisoned".to_string()))?;
        competitions.push(record);
        Ok(())
    }
}
