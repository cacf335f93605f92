//! Connection gateway.
//!
//! Owns every live connection's outbox and the connection-to-room index, and
//! routes decoded client messages to the right room actor. A connection sits
//! in at most one room at a time.

use crate::dispatcher::Outbox;
use crate::error::{CoordinatorError, Result};
use crate::registry::RoomRegistry;
use crate::room::{RoomCommand, RoomHandle};
use crate::store::RoomStore;
use log::{debug, info, warn};
use shared::{ClientMessage, ConnectionId, ServerEvent, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Attempts at joining when the looked-up room keeps closing underneath us.
const JOIN_ATTEMPTS: usize = 3;

struct Session {
    outbox: Outbox,
    room: Option<RoomHandle>,
}

pub struct Gateway {
    registry: RoomRegistry,
    store: Arc<dyn RoomStore>,
    outbox_capacity: usize,
    sessions: Mutex<HashMap<ConnectionId, Session>>,
    next_connection_id: AtomicU64,
}

impl Gateway {
    pub fn new(registry: RoomRegistry, store: Arc<dyn RoomStore>, outbox_capacity: usize) -> Self {
        Self {
            registry,
            store,
            outbox_capacity,
            sessions: Mutex::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<ConnectionId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn connection_count(&self) -> usize {
        self.sessions().len()
    }

    /// Registers a new connection. The receiver yields everything that
    /// should be written to it.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let connection_id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, events) = Outbox::channel(connection_id, self.outbox_capacity);

        self.sessions()
            .insert(connection_id, Session { outbox, room: None });
        info!("Connection {} opened", connection_id);
        (connection_id, events)
    }

    /// Forgets a connection, leaving its room if it was in one.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let Some(session) = self.sessions().remove(&connection_id) else {
            return;
        };
        if let Some(room) = session.room {
            leave(&room, connection_id);
        }
        info!("Connection {} closed", connection_id);
    }

    /// Sends an event straight to one connection.
    pub fn reply(&self, connection_id: ConnectionId, event: ServerEvent) {
        let outbox = self
            .sessions()
            .get(&connection_id)
            .map(|session| session.outbox.clone());
        match outbox {
            Some(outbox) => {
                outbox.deliver(event);
            }
            None => debug!("Dropping {} for departed {}", event.kind(), connection_id),
        }
    }

    /// Routes one client message. Failures are reported back to the sender
    /// as an `error` event.
    pub async fn handle(&self, connection_id: ConnectionId, message: ClientMessage) {
        debug!("{} sent {}", connection_id, message.kind());

        if let Err(e) = self.dispatch(connection_id, message).await {
            debug!("Request from {} failed: {}", connection_id, e);
            self.reply(connection_id, ServerEvent::error(e.to_string()));
        }
    }

    async fn dispatch(&self, connection_id: ConnectionId, message: ClientMessage) -> Result<()> {
        let (room_code, command) = match message {
            ClientMessage::JoinRoom { room_code, user } => {
                return self.join(connection_id, &room_code, user).await;
            }
            ClientMessage::LeaveRoom { room_code } => {
                let room = self.take_membership(connection_id, &room_code)?;
                leave(&room, connection_id);
                return Ok(());
            }
            ClientMessage::ToggleReady { room_code } => {
                (room_code, RoomCommand::ToggleReady { connection_id })
            }
            ClientMessage::UpdateSettings {
                room_code,
                settings,
            } => (
                room_code,
                RoomCommand::UpdateSettings {
                    connection_id,
                    patch: settings,
                },
            ),
            ClientMessage::StartGame { room_code, passage } => (
                room_code,
                RoomCommand::StartGame {
                    connection_id,
                    passage,
                },
            ),
            ClientMessage::ProgressUpdate {
                room_code,
                progress,
                wpm,
                accuracy,
            } => (
                room_code,
                RoomCommand::Progress {
                    connection_id,
                    progress,
                    wpm,
                    accuracy,
                },
            ),
            ClientMessage::SubmitResult { room_code, result } => (
                room_code,
                RoomCommand::SubmitResult {
                    connection_id,
                    result,
                },
            ),
            ClientMessage::ResetRoom { room_code } => {
                (room_code, RoomCommand::Reset { connection_id })
            }
        };

        let room = self.membership(connection_id, &room_code)?;
        room.send(command)
    }

    /// The room this connection is in, provided it is `room_code`.
    fn membership(&self, connection_id: ConnectionId, room_code: &str) -> Result<RoomHandle> {
        self.sessions()
            .get(&connection_id)
            .and_then(|session| session.room.clone())
            .filter(|room| room.code() == room_code)
            .ok_or_else(|| CoordinatorError::RoomNotFound(room_code.to_string()))
    }

    fn take_membership(&self, connection_id: ConnectionId, room_code: &str) -> Result<RoomHandle> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(&connection_id)
            .filter(|session| {
                session
                    .room
                    .as_ref()
                    .map_or(false, |room| room.code() == room_code)
            })
            .ok_or_else(|| CoordinatorError::RoomNotFound(room_code.to_string()))?;
        session
            .room
            .take()
            .ok_or_else(|| CoordinatorError::RoomNotFound(room_code.to_string()))
    }

    async fn join(&self, connection_id: ConnectionId, room_code: &str, user: User) -> Result<()> {
        if !self.store.room_exists(room_code).await? {
            return Err(CoordinatorError::RoomNotFound(room_code.to_string()));
        }

        // Leave the current room unless this is a repeat join of the same one.
        let outbox = {
            let mut sessions = self.sessions();
            let Some(session) = sessions.get_mut(&connection_id) else {
                return Ok(());
            };
            let switching = session
                .room
                .as_ref()
                .map_or(false, |room| room.code() != room_code);
            if switching {
                if let Some(previous) = session.room.take() {
                    leave(&previous, connection_id);
                }
            }
            session.outbox.clone()
        };

        let mut attempts = 0;
        let room = loop {
            attempts += 1;
            let room = self.registry.get_or_create(room_code, &user);
            match room.join(connection_id, user.clone(), outbox.clone()).await {
                Ok(view) => {
                    debug!(
                        "{} seated in {} with {} participant(s)",
                        connection_id,
                        room_code,
                        view.participants.len()
                    );
                    break room;
                }
                Err(CoordinatorError::RoomClosed(_)) if attempts < JOIN_ATTEMPTS => {
                    debug!("Room {} closed during join, retrying", room_code);
                }
                Err(e) => {
                    warn!("{} could not join {}: {}", connection_id, room_code, e);
                    return Err(e);
                }
            }
        };

        let mut sessions = self.sessions();
        match sessions.get_mut(&connection_id) {
            Some(session) => session.room = Some(room),
            None => {
                // Disconnected while the join was in flight.
                leave(&room, connection_id);
            }
        }
        Ok(())
    }
}

fn leave(room: &RoomHandle, connection_id: ConnectionId) {
    if room.send(RoomCommand::Leave { connection_id }).is_err() {
        debug!("Room {} already closed when {} left", room.code(), connection_id);
    }
}
