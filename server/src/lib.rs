//! # Typing Race Coordinator
//!
//! Server side of a multiplayer typing race. Clients connect over a
//! WebSocket, join rooms by code, and race to type the same passage. The
//! server is authoritative for room membership, the host role, the race
//! lifecycle and the final standings; clients report their own progress and
//! results.
//!
//! ## Core Responsibilities
//!
//! ### Room Lifecycle
//! Rooms are created on first join and disappear when their last
//! participant leaves. Each room moves through
//! `waiting -> countdown -> active -> finished`, and the host can reset it
//! back to `waiting` at any time.
//!
//! ### Race Timing
//! A race opens with a countdown and is forced to finish once the time limit
//! plus a short grace period has passed, even if some racers never submit.
//!
//! ### Standings
//! When every entrant has submitted, or the deadline fires, results are
//! ranked by words per minute and then accuracy. Racers who never submitted
//! are ranked on their last live figures. Standings are broadcast and handed
//! to the store.
//!
//! ## Architecture Design
//!
//! ### One Task per Room
//! Every room is an actor: a tokio task owning the room state and draining a
//! mailbox of commands together with the events of its own clock. Work for
//! one room is therefore strictly sequential while separate rooms never
//! contend with each other.
//!
//! ### Non-blocking Fan-out
//! Each connection has a bounded outbox drained by its socket writer. Rooms
//! push into outboxes without waiting, so a slow client only loses its own
//! events.
//!
//! ## Module Organization
//!
//! ### Registry (`registry`)
//! Maps room codes to running rooms and serializes creation so concurrent
//! joins to a new code land in the same room.
//!
//! ### Room (`room`)
//! The room state machine, its command set and the actor loop.
//!
//! ### Clock (`clock`)
//! Countdown ticks and the forced-finish deadline, cancellable as a whole.
//!
//! ### Aggregator (`aggregator`)
//! Completion check and final standings for a race.
//!
//! ### Dispatcher (`dispatcher`)
//! Per-connection outboxes and broadcast helpers.
//!
//! ### Gateway (`gateway`)
//! Connection bookkeeping and routing of client messages to rooms.
//!
//! ### Network (`network`)
//! WebSocket listener and per-connection reader and writer tasks.
//!
//! ### Store and Passages (`store`, `passage`)
//! Collaborators for room validation, result persistence and passage text.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod network;
pub mod passage;
pub mod registry;
pub mod room;
pub mod store;

pub use config::{RoomConfig, ServerConfig};
pub use error::{CoordinatorError, Result};
pub use gateway::Gateway;
pub use network::Server;
pub use registry::RoomRegistry;
