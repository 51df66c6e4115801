use crate::buffer::LogBuffer;
use crate::config::{Config, SharedConfig};
use crate::time::{Clock, SystemClock, TimeScale};
use std::sync::Arc;

/// Everything the collector components share: the live configuration, the
/// log buffer and the clock. Built once per page and cloned into each
/// component.
#[derive(Clone)]
pub struct Context {
    pub config: SharedConfig,
    pub buffer: LogBuffer,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: SharedConfig::new(config),
            buffer: LogBuffer::new(),
            clock,
        }
    }

    /// Chooses the timestamp scale from a sample event timestamp and stores
    /// it in the configuration.
    pub fn calibrate(&self, sample_timestamp: Option<f64>) -> TimeScale {
        let scale = TimeScale::calibrate(sample_timestamp, self.clock.as_ref());
        self.config.update(|config| config.time = scale);
        scale
    }
}
