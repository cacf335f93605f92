//! # Typing Race Client Library
//!
//! Client-side pieces for talking to the race coordinator: a WebSocket
//! connection that speaks the JSON protocol from `shared`, and a simulated
//! typist that can take part in races unattended.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - Connects to the coordinator over `ws://`
//! - Encodes outgoing `ClientMessage`s and decodes incoming `ServerEvent`s
//!
//! ### Bot Module (`bot`)
//! - Types a passage at a target speed with a configurable error rate
//! - Produces live progress and the final `SubmittedResult`, computed the
//!   same way a browser client computes them

pub mod bot;
pub mod network;

pub use bot::TypingBot;
pub use network::{ClientResult, Connection};
