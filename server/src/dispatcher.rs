//! Outbound event delivery.
//!
//! Every connection owns a bounded queue drained by its socket writer. Rooms
//! push into those queues with `try_send`, so a slow or vanished client can
//! only lose its own events; it never stalls the room that is broadcasting.

use log::{debug, warn};
use shared::{ConnectionId, ServerEvent};
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone)]
pub struct Outbox {
    connection_id: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
}

impl Outbox {
    pub fn new(connection_id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            connection_id,
            sender,
        }
    }

    /// Creates an outbox together with the receiving end its writer drains.
    pub fn channel(
        connection_id: ConnectionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(connection_id, sender), receiver)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queues an event without waiting. Returns false if it was dropped.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Outbox for {} is full, dropping {} event",
                    self.connection_id,
                    event.kind()
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!(
                    "Outbox for {} is closed, discarding {} event",
                    self.connection_id,
                    event.kind()
                );
                false
            }
        }
    }
}

/// Sends `event` to every outbox. Returns how many accepted it.
pub fn fan_out<'a, I>(recipients: I, event: &ServerEvent) -> usize
where
    I: IntoIterator<Item = &'a Outbox>,
{
    recipients
        .into_iter()
        .filter(|outbox| outbox.deliver(event.clone()))
        .count()
}
