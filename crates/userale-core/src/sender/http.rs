use super::transport::{CONTENT_TYPE, Transport, encode_batch};
use crate::config::SharedConfig;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header;
use tracing::{debug, warn};
use userale_common::error::TransportError;
use userale_common::protocol::BufferedLog;

/// POSTs batches as JSON to the configured collector URL. The URL is read
/// from the shared configuration on every attempt.
pub struct HttpTransport {
    client: Client,
    config: SharedConfig,
    beacon: bool,
}

impl HttpTransport {
    pub fn new(config: SharedConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: SharedConfig) -> Self {
        Self {
            client,
            config,
            beacon: true,
        }
    }

    /// Disables the beacon path, forcing unload flushes through the
    /// retrying `send`.
    pub fn without_beacon(mut self) -> Self {
        self.beacon = false;
        self
    }

    fn url(&self) -> String {
        self.config.read(|c| c.url.clone())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &[BufferedLog]) -> Result<(), TransportError> {
        let body = encode_batch(batch)?;
        let response = self
            .client
            .post(self.url())
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(logs = batch.len(), status = status.as_u16(), "batch delivered");
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    fn supports_beacon(&self) -> bool {
        self.beacon && tokio::runtime::Handle::try_current().is_ok()
    }

    fn beacon(&self, batch: &[BufferedLog]) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let body = match encode_batch(batch) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode beacon payload: {}", e);
                return false;
            }
        };

        let request = self
            .client
            .post(self.url())
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body);
        handle.spawn(async move {
            if let Err(e) = request.send().await {
                debug!("Beacon delivery failed: {}", e);
            }
        });
        true
    }
}
