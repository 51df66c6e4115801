use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for the collector.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> f64;

    /// Epoch milliseconds at which the page started navigating.
    fn navigation_start(&self) -> f64;
}

fn epoch_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64
}

pub struct SystemClock {
    navigation_start: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            navigation_start: epoch_ms(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        epoch_ms()
    }

    fn navigation_start(&self) -> f64 {
        self.navigation_start
    }
}

/// A clock that only moves when told to. Used by hosts replaying recorded
/// sessions and by tests.
pub struct ManualClock {
    now: Mutex<f64>,
    navigation_start: f64,
}

impl ManualClock {
    pub fn new(now: f64, navigation_start: f64) -> Self {
        Self {
            now: Mutex::new(now),
            navigation_start,
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, ms: f64) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn navigation_start(&self) -> f64 {
        self.navigation_start
    }
}

/// Maps raw event timestamps onto epoch milliseconds.
///
/// Browsers disagree on what `Event.timeStamp` means: some report epoch
/// milliseconds, some report milliseconds since navigation start, and some
/// a high-resolution monotonic value. The scale is chosen once from a
/// sample event and reused for every event after that.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum TimeScale {
    /// The sample had no usable timestamp; use the clock at packaging time.
    #[default]
    WallClock,
    /// The sample's timestamp was ahead of the clock. Always yields
    /// `sample / 1000`, regardless of the argument.
    Frozen(f64),
    /// Timestamps are relative to navigation start.
    NavigationOffset(f64),
    /// Timestamps are already epoch milliseconds.
    Identity,
}

impl TimeScale {
    pub fn calibrate(sample: Option<f64>, clock: &dyn Clock) -> Self {
        let sample = match sample {
            Some(ts) if ts > 0.0 => ts,
            _ => return TimeScale::WallClock,
        };

        let delta = clock.now_ms() - sample;
        if delta < 0.0 {
            TimeScale::Frozen(sample / 1000.0)
        } else if delta > sample {
            TimeScale::NavigationOffset(clock.navigation_start())
        } else {
            TimeScale::Identity
        }
    }

    pub fn normalize(&self, raw: f64, clock: &dyn Clock) -> f64 {
        match self {
            TimeScale::WallClock => clock.now_ms(),
            TimeScale::Frozen(value) => *value,
            TimeScale::NavigationOffset(start) => raw + start,
            TimeScale::Identity => raw,
        }
    }
}
