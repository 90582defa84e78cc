use crate::{
    DeviceCommand, DeviceSnapshot, LogEntry, LogFilter, Result, SensorGroup, SensorReading,
    SwarmSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One request observed by a [`MockSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Devices,
    SensorValues(Option<String>),
    Logs(LogFilter),
    NewLogs(LogFilter),
    SensorSettings,
    Toggle { name: String, enabled: bool },
    Command { command: DeviceCommand, device: String },
}

#[derive(Default)]
struct Script {
    devices: VecDeque<Result<Vec<DeviceSnapshot>>>,
    sensor_values: VecDeque<Result<Vec<SensorReading>>>,
    logs: VecDeque<Result<Vec<LogEntry>>>,
    new_logs: VecDeque<Result<Vec<LogEntry>>>,
    settings: VecDeque<Result<Vec<SensorGroup>>>,
    calls: Vec<MockCall>,
}

/// A scripted in-process backend. Each endpoint answers from its own queue of
/// prepared responses; an exhausted queue answers with an empty list, like a
/// quiet receiver.
#[derive(Default)]
pub struct MockSource {
    script: Mutex<Script>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_devices(&self, response: Result<Vec<DeviceSnapshot>>) {
        self.script.lock().devices.push_back(response);
    }

    pub fn push_sensor_values(&self, response: Result<Vec<SensorReading>>) {
        self.script.lock().sensor_values.push_back(response);
    }

    pub fn push_logs(&self, response: Result<Vec<LogEntry>>) {
        self.script.lock().logs.push_back(response);
    }

    pub fn push_new_logs(&self, response: Result<Vec<LogEntry>>) {
        self.script.lock().new_logs.push_back(response);
    }

    pub fn push_settings(&self, response: Result<Vec<SensorGroup>>) {
        self.script.lock().settings.push_back(response);
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().calls.len()
    }

    fn record<T>(
        &self,
        call: MockCall,
        pick: impl FnOnce(&mut Script) -> &mut VecDeque<Result<Vec<T>>>,
    ) -> Result<Vec<T>> {
        let mut script = self.script.lock();
        script.calls.push(call);
        pick(&mut script).pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl SwarmSource for MockSource {
    async fn devices(&self) -> Result<Vec<DeviceSnapshot>> {
        self.record(MockCall::Devices, |s| &mut s.devices)
    }

    async fn sensor_values(&self, device: Option<&str>) -> Result<Vec<SensorReading>> {
        self.record(MockCall::SensorValues(device.map(str::to_string)), |s| {
            &mut s.sensor_values
        })
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.record(MockCall::Logs(filter.clone()), |s| &mut s.logs)
    }

    async fn new_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.record(MockCall::NewLogs(filter.clone()), |s| &mut s.new_logs)
    }

    async fn sensor_settings(&self) -> Result<Vec<SensorGroup>> {
        self.record(MockCall::SensorSettings, |s| &mut s.settings)
    }

    async fn toggle_function(&self, name: &str, enabled: bool) -> Result<()> {
        self.script.lock().calls.push(MockCall::Toggle {
            name: name.to_string(),
            enabled,
        });
        Ok(())
    }

    async fn send_command(&self, command: DeviceCommand, device: &str) -> Result<()> {
        self.script.lock().calls.push(MockCall::Command {
            command,
            device: device.to_string(),
        });
        Ok(())
    }
}
