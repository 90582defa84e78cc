use crate::{
    DeviceCommand, DeviceSnapshot, LogEntry, LogFilter, Result, SensorGroup, SensorReading,
};
use async_trait::async_trait;

/// Read-mostly request/response access to the swarm backend.
///
/// Every call is a single round trip; implementations keep no client-side
/// cursor. `new_logs` relies on the backend remembering what it already
/// delivered for the filter.
#[async_trait]
pub trait SwarmSource: Send + Sync {
    /// Current presence snapshot of every known device.
    async fn devices(&self) -> Result<Vec<DeviceSnapshot>>;

    /// Full set of enabled sensor readings, locally or for a relayed device.
    async fn sensor_values(&self, device: Option<&str>) -> Result<Vec<SensorReading>>;

    /// Every retained log entry matching the filter.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    /// Log entries appended since the previous `logs`/`new_logs` call.
    async fn new_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    /// Sensor functions grouped by sensor, with their enabled state.
    async fn sensor_settings(&self) -> Result<Vec<SensorGroup>>;

    /// Enable or disable one sensor function.
    async fn toggle_function(&self, name: &str, enabled: bool) -> Result<()>;

    /// Send a command to one device of the swarm.
    async fn send_command(&self, command: DeviceCommand, device: &str) -> Result<()>;
}
