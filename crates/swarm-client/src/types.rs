use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One enabled sensor function and its current encoded value.
///
/// `value` is opaque text: a plain number (`"21.5"`), a labelled list
/// (`"x:0.1,y:0.2,z:9.8"`), or anything else the firmware chose to print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub value: String,
}

impl SensorReading {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: String,
    pub timestamp: String,
    pub message: String,
    /// Hardware address of the sending node; absent for local/broadcast entries.
    #[serde(rename = "mac", default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

impl LogEntry {
    pub fn new(
        level: impl Into<String>,
        timestamp: impl Into<String>,
        message: impl Into<String>,
        sender_id: Option<&str>,
    ) -> Self {
        Self {
            level: level.into(),
            timestamp: timestamp.into(),
            message: message.into(),
            sender_id: sender_id.map(str::to_string),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_broadcast(&self) -> bool {
        self.sender().is_none()
    }
}

/// Presence record of a single swarm node as reported by the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[serde(rename = "mac")]
    pub id: String,
    pub counter: u64,
    #[serde(rename = "uptime")]
    pub uptime_ms: u64,
    /// Milliseconds since the receiver last heard from the node.
    #[serde(rename = "lastSeen")]
    pub last_seen_ms: u64,
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mw: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    All,
    Info,
    Warning,
    Error,
    Debug,
    Trace,
}

impl LogLevel {
    pub const LEVELS: [LogLevel; 6] = [
        LogLevel::All,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::All => "ALL",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::LEVELS
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

/// Selection applied to both full and incremental log fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LogFilter {
    pub level: LogLevel,
    /// Restrict to entries from one sender; `None` means every sender.
    #[serde(default)]
    pub sender: Option<String>,
}

impl LogFilter {
    pub fn new(level: LogLevel, sender: Option<String>) -> Self {
        Self {
            level,
            sender: sender.filter(|s| !s.is_empty()),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("level", self.level.as_str().to_string())];
        if let Some(sender) = &self.sender {
            pairs.push(("mac", sender.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFunction {
    pub name: String,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorGroup {
    pub sensor_name: String,
    #[serde(default)]
    pub functions: Vec<SensorFunction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    /// Blink/beep so the node can be found physically.
    Locate,
    Forward,
    Stop,
}

impl DeviceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCommand::Locate => "locate",
            DeviceCommand::Forward => "forward",
            DeviceCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_snapshot_wire_names() {
        let json = r#"{"mac":"AA:BB:CC:00:11:22","counter":42,"uptime":3661000,"lastSeen":250,"online":true,"powerMw":118.5}"#;
        let device: DeviceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "AA:BB:CC:00:11:22");
        assert_eq!(device.counter, 42);
        assert_eq!(device.uptime_ms, 3_661_000);
        assert_eq!(device.last_seen_ms, 250);
        assert!(device.online);
        assert_eq!(device.power_mw, Some(118.5));
    }

    #[test]
    fn test_device_snapshot_without_power() {
        let json = r#"{"mac":"01","counter":0,"uptime":0,"lastSeen":9000,"online":false}"#;
        let device: DeviceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_mw, None);
        assert!(!device.online);
    }

    #[test]
    fn test_log_entry_sender_is_optional() {
        let local: LogEntry =
            serde_json::from_str(r#"{"level":"INFO","timestamp":"00:01","message":"boot"}"#)
                .unwrap();
        assert!(local.is_broadcast());

        let empty: LogEntry = serde_json::from_str(
            r#"{"level":"INFO","timestamp":"00:01","message":"boot","mac":""}"#,
        )
        .unwrap();
        assert!(empty.is_broadcast());

        let remote: LogEntry = serde_json::from_str(
            r#"{"level":"ERROR","timestamp":"00:02","message":"imu fault","mac":"AA:01"}"#,
        )
        .unwrap();
        assert_eq!(remote.sender(), Some("AA:01"));
    }

    #[test]
    fn test_log_level_parse_and_display() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("ALL".parse::<LogLevel>().unwrap(), LogLevel::All);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Trace.to_string(), "TRACE");
        assert_eq!(serde_json::to_string(&LogLevel::Debug).unwrap(), "\"DEBUG\"");
    }

    #[test]
    fn test_log_filter_query_pairs() {
        let all = LogFilter::default();
        assert_eq!(all.query_pairs(), vec![("level", "ALL".to_string())]);

        let one = LogFilter::new(LogLevel::Error, Some("AA:01".to_string()));
        assert_eq!(
            one.query_pairs(),
            vec![("level", "ERROR".to_string()), ("mac", "AA:01".to_string())]
        );

        let blank = LogFilter::new(LogLevel::Info, Some(String::new()));
        assert_eq!(blank.sender, None);
    }

    #[test]
    fn test_sensor_group_wire_names() {
        let json = r#"[{"sensorName":"MPU6050","functions":[{"name":"Acceleration","state":true},{"name":"TiltDirection","state":false}]}]"#;
        let groups: Vec<SensorGroup> = serde_json::from_str(json).unwrap();
        assert_eq!(groups[0].sensor_name, "MPU6050");
        assert_eq!(groups[0].functions.len(), 2);
        assert!(!groups[0].functions[1].state);
    }
}
