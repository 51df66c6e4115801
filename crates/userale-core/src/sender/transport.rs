use async_trait::async_trait;
use userale_common::error::TransportError;
use userale_common::protocol::BufferedLog;

pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// A delivery channel for batches of logs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Makes one delivery attempt. Retrying is the caller's business.
    async fn send(&self, batch: &[BufferedLog]) -> Result<(), TransportError>;

    /// Whether `beacon` is available in this environment.
    fn supports_beacon(&self) -> bool {
        false
    }

    /// Queues a fire-and-forget delivery that may outlive the caller.
    /// Returns `false` when the batch could not be queued.
    fn beacon(&self, _batch: &[BufferedLog]) -> bool {
        false
    }
}

/// Serializes a batch into the JSON array sent on the wire.
pub fn encode_batch(batch: &[BufferedLog]) -> Result<Vec<u8>, TransportError> {
    Ok(serde_json::to_vec(batch)?)
}
