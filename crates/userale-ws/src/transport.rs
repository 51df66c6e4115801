use async_trait::async_trait;
use futures::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};
use userale_common::error::TransportError;
use userale_common::protocol::BufferedLog;
use userale_core::config::SharedConfig;
use userale_core::sender::Transport;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One batch as emitted on the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketEnvelope {
    pub channel: String,
    pub logs: Vec<BufferedLog>,
}

/// Emits batches as text frames over a WebSocket to `config.url`, tagged
/// with `config.socket_channel`. Connects lazily and reconnects on the next
/// attempt after a failure.
pub struct SocketTransport {
    config: SharedConfig,
    socket: Mutex<Option<Socket>>,
}

impl SocketTransport {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            socket: Mutex::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.socket.lock().await.is_some()
    }

    /// Closes the connection, if any.
    pub async fn close(&self) {
        if let Some(mut socket) = self.socket.lock().await.take() {
            if let Err(e) = socket.close(None).await {
                warn!("Error closing socket: {}", e);
            }
        }
    }

    async fn connect(&self) -> Result<Socket, TransportError> {
        let url = self.config.read(|c| c.url.clone());
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))?;
        info!("Connected log socket to {}", url);
        Ok(socket)
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&self, batch: &[BufferedLog]) -> Result<(), TransportError> {
        let envelope = SocketEnvelope {
            channel: self.config.read(|c| c.socket_channel.clone()),
            logs: batch.to_vec(),
        };
        let text = serde_json::to_string(&envelope)?;

        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let socket = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = socket.send(Message::Text(text)).await {
            // Drop the broken connection so the retry reconnects.
            *guard = None;
            return Err(TransportError::Socket(e.to_string()));
        }
        Ok(())
    }
}
