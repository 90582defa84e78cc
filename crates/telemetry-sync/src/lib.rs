//! telemetry-sync: real-time telemetry windows, log tailing and liveness for a sensor swarm
//!
//! Three independent pipelines read from a [`swarm_client::SwarmSource`]:
//! the [`TelemetryPoller`] turns sensor readings into bounded per-label
//! series, the [`LogTailer`] keeps an append-only log collection in sync
//! through full-then-delta fetches, and the [`LivenessTracker`] derives device
//! presence rows. Each pipeline owns its state and publishes it through a
//! shared read-only view; [`Subscription`] runs one on its own task.

mod config;
pub use config::{
    clamp_capacity, Cadence, PollIntervals, WindowCapacity, CAPACITY_STEP, DEFAULT_CAPACITY,
    MAX_CAPACITY, MIN_CAPACITY,
};

mod error;
pub use error::{Result, SyncError};

pub mod decode;
pub use decode::{decode, display_value, Decoded, DecodeKind};

mod window;
pub use window::{Point, WindowedBuffer};

mod series;
pub use series::{SensorKey, SensorSeries, Series, SeriesRegistered, SeriesRegistry};

mod schedule;
pub use schedule::{
    run_pipeline, IntervalTicker, ManualClock, ManualTicker, Notice, Pipeline, Subscription,
    TickReport, Ticker,
};

mod poller;
pub use poller::{SeriesView, TelemetryPoller};

mod logs;
pub use logs::{sender_options, LogTailHandle, LogTailer, LogView};

mod liveness;
pub use liveness::{
    derive_rows, format_last_seen, format_uptime, DeviceRow, LivenessTracker, SwarmSummary,
    SwarmView,
};

mod metrics;
pub use metrics::SyncMetrics;
