use thiserror::Error;

/// Failure of a single delivery attempt. Never surfaced to the host page;
/// the sender retries within its budget and then drops the batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Collector responded with status {0}")]
    Status(u16),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Socket error: {0}")]
    Socket(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
