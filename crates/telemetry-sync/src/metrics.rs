use crate::error::Result;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Counters and gauges shared by all pipelines of a session.
#[derive(Clone)]
pub struct SyncMetrics {
    pub registry: Registry,
    pub polls: IntCounter,
    pub poll_failures: IntCounter,
    pub points_ingested: IntCounter,
    pub unrecognized_values: IntCounter,
    pub series_registered: IntGauge,
    pub log_fetch_failures: IntCounter,
    pub log_entries: IntGauge,
    pub devices_online: IntGauge,
    pub device_fetch_failures: IntCounter,
}

impl SyncMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let polls = IntCounter::new(
            "swarm_telemetry_polls_total",
            "Sensor polls applied to the series registry",
        )?;
        let poll_failures = IntCounter::new(
            "swarm_telemetry_poll_failures_total",
            "Sensor polls that returned no data",
        )?;
        let points_ingested = IntCounter::new(
            "swarm_points_ingested_total",
            "Decoded points appended to series windows",
        )?;
        let unrecognized_values = IntCounter::new(
            "swarm_unrecognized_values_total",
            "Sensor values that decoded to no numeric component",
        )?;
        let series_registered =
            IntGauge::new("swarm_series_registered", "Series allocated this session")?;
        let log_fetch_failures = IntCounter::new(
            "swarm_log_fetch_failures_total",
            "Full or incremental log fetches that returned no data",
        )?;
        let log_entries = IntGauge::new("swarm_log_entries", "Log entries held for the active filter")?;
        let devices_online =
            IntGauge::new("swarm_devices_online", "Devices reported online by the last snapshot")?;
        let device_fetch_failures = IntCounter::new(
            "swarm_device_fetch_failures_total",
            "Device snapshot fetches that returned no data",
        )?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(poll_failures.clone()))?;
        registry.register(Box::new(points_ingested.clone()))?;
        registry.register(Box::new(unrecognized_values.clone()))?;
        registry.register(Box::new(series_registered.clone()))?;
        registry.register(Box::new(log_fetch_failures.clone()))?;
        registry.register(Box::new(log_entries.clone()))?;
        registry.register(Box::new(devices_online.clone()))?;
        registry.register(Box::new(device_fetch_failures.clone()))?;

        Ok(Self {
            registry,
            polls,
            poll_failures,
            points_ingested,
            unrecognized_values,
            series_registered,
            log_fetch_failures,
            log_entries,
            devices_online,
            device_fetch_failures,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
