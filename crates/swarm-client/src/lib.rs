//! swarm-client: wire types and request/response access to the swarm debug backend
//!
//! The receiver node of a wireless sensor swarm exposes a small read-mostly HTTP
//! surface (device presence, live sensor values, a log ring, and a few commands).
//! This crate models that surface as the [`SwarmSource`] trait with a reqwest
//! backend. The default build enables a scripted `mock` backend so pipelines can
//! be exercised without hardware.

mod types;
pub use types::{
    DeviceCommand, DeviceSnapshot, LogEntry, LogFilter, LogLevel, SensorFunction, SensorGroup,
    SensorReading,
};

mod error;
pub use error::{Result, SourceError};

mod traits;
pub use traits::SwarmSource;

mod http;
pub use http::{endpoints, HttpSwarmSource, DEFAULT_TIMEOUT};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCall, MockSource};
