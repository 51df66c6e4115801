use std::sync::{Arc, Mutex, MutexGuard};
use userale_common::protocol::BufferedLog;

/// The shared, ordered queue of logs waiting to be transmitted.
///
/// Every clone refers to the same container. Clearing always truncates in
/// place so that all holders keep observing the same queue.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<BufferedLog>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BufferedLog>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, log: impl Into<BufferedLog>) {
        self.lock().push(log.into());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<BufferedLog> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copies out every buffered log and empties the buffer in one step.
    pub fn drain(&self) -> Vec<BufferedLog> {
        self.lock().drain(..).collect()
    }

    /// Drains the buffer only when it holds at least `threshold` logs.
    pub fn drain_at_least(&self, threshold: usize) -> Option<Vec<BufferedLog>> {
        let mut guard = self.lock();
        if guard.len() >= threshold {
            Some(guard.drain(..).collect())
        } else {
            None
        }
    }

    pub fn same_buffer(&self, other: &LogBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_identity() {
        let buffer = LogBuffer::new();
        let alias = buffer.clone();
        buffer.push(BufferedLog::Custom(json!({ "n": 1 })));
        assert_eq!(alias.len(), 1);

        alias.clear();
        assert!(buffer.is_empty());
        assert!(buffer.same_buffer(&alias));
        assert!(!buffer.same_buffer(&LogBuffer::new()));
    }

    #[test]
    fn drain_keeps_order_and_empties() {
        let buffer = LogBuffer::new();
        for n in 0..3 {
            buffer.push(BufferedLog::Custom(json!({ "n": n })));
        }

        assert!(buffer.drain_at_least(4).is_none());
        assert_eq!(buffer.len(), 3);

        let batch = buffer.drain_at_least(3).unwrap();
        assert_eq!(
            batch,
            (0..3)
                .map(|n| BufferedLog::Custom(json!({ "n": n })))
                .collect::<Vec<_>>()
        );
        assert!(buffer.is_empty());

        buffer.push(BufferedLog::Custom(json!({ "n": 3 })));
        assert_eq!(buffer.len(), 1);
    }
}
