//! WebSocket connection to the race coordinator.

use futures_util::{SinkExt, StreamExt};
use log::debug;
use shared::{decode_event, encode_message, ClientMessage, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct Connection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    /// Opens a connection to a `ws://` URL.
    pub async fn connect(url: &str) -> ClientResult<Self> {
        let (stream, _response) = connect_async(url).await?;
        debug!("Connected to {}", url);
        Ok(Self { stream })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> ClientResult<()> {
        let text = encode_message(message)?;
        self.send_text(text).await
    }

    /// Sends a text frame as-is, without encoding.
    pub async fn send_text(&mut self, text: impl Into<String>) -> ClientResult<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Waits for the next server event. `None` once the server has closed
    /// the connection.
    pub async fn next_event(&mut self) -> ClientResult<Option<ServerEvent>> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(decode_event(text.as_bytes())?)),
                Message::Binary(data) => return Ok(Some(decode_event(&data)?)),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
