use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the timestamp stamped into new lifeboat names.
pub trait Clock {
    fn now_unix_sec(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_sec(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    timestamp: u64,
}

impl FixedClock {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl Clock for FixedClock {
    fn now_unix_sec(&self) -> u64 {
        self.timestamp
    }
}
