use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Smallest window a series may be limited to.
pub const MIN_CAPACITY: usize = 50;
/// Largest window a series may be limited to.
pub const MAX_CAPACITY: usize = 2000;
pub const DEFAULT_CAPACITY: usize = 100;
/// Increment used by interactive capacity controls.
pub const CAPACITY_STEP: usize = 50;

/// Refresh periods of the independent pipelines, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    /// Sensor polling against the receiver's own sensors.
    pub local_ms: u64,
    /// Sensor polling relayed through the receiver to a remote node.
    pub remote_ms: u64,
    pub logs_ms: u64,
    pub swarm_ms: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            local_ms: 100,
            remote_ms: 1000,
            logs_ms: 1000,
            swarm_ms: 1000,
        }
    }
}

impl PollIntervals {
    pub fn logs(&self) -> Duration {
        Duration::from_millis(self.logs_ms.max(1))
    }

    pub fn swarm(&self) -> Duration {
        Duration::from_millis(self.swarm_ms.max(1))
    }
}

/// Sensor polling cadence, fixed for the lifetime of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Local,
    Remote,
}

impl Cadence {
    /// Readings of a remote node travel over the radio link, so they are
    /// polled at the slower rate.
    pub fn for_device(device: Option<&str>) -> Self {
        match device {
            Some(id) if !id.is_empty() => Cadence::Remote,
            _ => Cadence::Local,
        }
    }

    pub fn period(self, intervals: &PollIntervals) -> Duration {
        let ms = match self {
            Cadence::Local => intervals.local_ms,
            Cadence::Remote => intervals.remote_ms,
        };
        Duration::from_millis(ms.max(1))
    }
}

/// Shared, runtime-adjustable per-series window size.
///
/// Clones observe the same value. Writers clamp into
/// `[MIN_CAPACITY, MAX_CAPACITY]`; buffers read the value on each append, so a
/// smaller capacity only trims a series the next time it receives a point.
#[derive(Debug, Clone)]
pub struct WindowCapacity(Arc<AtomicUsize>);

impl WindowCapacity {
    pub fn new(value: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(clamp_capacity(value))))
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Stores the clamped value and returns what was stored.
    pub fn set(&self, value: usize) -> usize {
        let value = clamp_capacity(value);
        self.0.store(value, Ordering::Relaxed);
        value
    }
}

impl Default for WindowCapacity {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

pub fn clamp_capacity(value: usize) -> usize {
    value.clamp(MIN_CAPACITY, MAX_CAPACITY)
}
