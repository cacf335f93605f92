//! Runtime configuration for the coordinator.
//!
//! The binary builds these from command-line flags; tests construct them
//! directly, usually with shortened clock intervals.

use shared::{COUNTDOWN_FROM, COUNTDOWN_TICK, FINISH_GRACE};
use std::time::Duration;

/// Per-room timing.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// First countdown value; ticks run down to zero inclusive.
    pub countdown_from: u32,
    pub countdown_tick: Duration,
    /// Added to the time limit before an unfinished race is forced to end.
    pub finish_grace: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            countdown_from: COUNTDOWN_FROM,
            countdown_tick: COUNTDOWN_TICK,
            finish_grace: FINISH_GRACE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Events buffered per connection before new ones are dropped.
    pub outbox_capacity: usize,
    /// Room codes known to the store. Empty means every code is accepted.
    pub known_rooms: Vec<String>,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            outbox_capacity: 256,
            known_rooms: Vec::new(),
            room: RoomConfig::default(),
        }
    }
}
