//! WebSocket transport.
//!
//! Accepts TCP connections, upgrades them, and runs one reader loop plus one
//! writer task per connection. Frames carry JSON; text and binary frames are
//! both accepted. Everything past decoding is the gateway's business.

use crate::config::ServerConfig;
use crate::error::{CoordinatorError, Result};
use crate::gateway::Gateway;
use crate::passage::{PassageProvider, WordBankPassages};
use crate::registry::RoomRegistry;
use crate::room::RoomContext;
use crate::store::{MemoryStore, RoomStore};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_message, encode_event, ConnectionId, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

pub struct Server {
    listener: TcpListener,
    gateway: Arc<Gateway>,
}

impl Server {
    /// Binds using an in-memory store seeded from `config.known_rooms` and
    /// the built-in passage banks.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let store: Arc<dyn RoomStore> = if config.known_rooms.is_empty() {
            Arc::new(MemoryStore::open())
        } else {
            Arc::new(MemoryStore::with_rooms(config.known_rooms.iter().cloned()))
        };
        Self::bind_with(config, store, Arc::new(WordBankPassages)).await
    }

    pub async fn bind_with(
        config: &ServerConfig,
        store: Arc<dyn RoomStore>,
        passages: Arc<dyn PassageProvider>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let registry = RoomRegistry::new(RoomContext {
            config: config.room.clone(),
            store: Arc::clone(&store),
            passages,
        });
        let gateway = Arc::new(Gateway::new(registry, store, config.outbox_capacity));

        Ok(Self { listener, gateway })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let gateway = Arc::clone(&self.gateway);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, gateway).await {
                    warn!("Connection from {} ended with error: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, gateway: Arc<Gateway>) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (connection_id, events) = gateway.connect();
    debug!("{} is {}", addr, connection_id);

    let (sink, mut source) = ws_stream.split();
    let writer = tokio::spawn(write_events(connection_id, sink, events));

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => process_frame(&gateway, connection_id, text.as_bytes()).await,
            Ok(Message::Binary(data)) => process_frame(&gateway, connection_id, &data).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    gateway.disconnect(connection_id);
    writer.abort();
    Ok(())
}

async fn process_frame(gateway: &Gateway, connection_id: ConnectionId, data: &[u8]) {
    match decode_message(data) {
        Ok(message) => gateway.handle(connection_id, message).await,
        Err(e) => {
            debug!("Malformed frame from {}: {}", connection_id, e);
            let message = CoordinatorError::from(e).to_string();
            gateway.reply(connection_id, ServerEvent::error(message));
        }
    }
}

type EventSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

async fn write_events(
    connection_id: ConnectionId,
    mut sink: EventSink,
    mut events: mpsc::Receiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        let text = match encode_event(&event) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode {} for {}: {}", event.kind(), connection_id, e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!("Write to {} failed: {}", connection_id, e);
            break;
        }
    }
    let _ = sink.close().await;
}
