//! Telemetry poller: snapshot of sensor readings → decoder → series registry.

use crate::config::{Cadence, PollIntervals, WindowCapacity};
use crate::decode::{decode, display_value};
use crate::error::SyncError;
use crate::metrics::SyncMetrics;
use crate::schedule::{IntervalTicker, Notice, Pipeline, TickReport};
use crate::series::{SensorKey, SeriesRegistered, SeriesRegistry};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use swarm_client::{SensorReading, SwarmSource};
use tracing::{debug, trace};

/// Read side of a telemetry subscription.
#[derive(Debug, Clone, Default)]
pub struct SeriesView {
    pub registry: SeriesRegistry,
    /// Readings of the last applied cycle, in display order.
    pub latest: Vec<SensorReading>,
    pub notice: Option<Notice>,
}

impl SeriesView {
    /// `(name, display text)` for every sensor of the last applied cycle.
    pub fn display_values(&self) -> Vec<(String, String)> {
        self.latest
            .iter()
            .map(|r| (r.name.clone(), display_value(&r.name, &r.value).into_owned()))
            .collect()
    }
}

type RegisteredCallback = Box<dyn Fn(&SeriesRegistered) + Send + Sync>;

pub struct TelemetryPoller {
    source: Arc<dyn SwarmSource>,
    device: Option<String>,
    period: Duration,
    capacity: WindowCapacity,
    view: Arc<RwLock<SeriesView>>,
    metrics: Option<SyncMetrics>,
    on_registered: Option<RegisteredCallback>,
}

impl TelemetryPoller {
    /// Builds a poller for the local sensors (`device == None`) or for one
    /// relayed node. The cadence follows from that choice and cannot change.
    pub fn new(
        source: Arc<dyn SwarmSource>,
        device: Option<String>,
        intervals: &PollIntervals,
        capacity: WindowCapacity,
    ) -> Self {
        let device = device.filter(|d| !d.is_empty());
        let period = Cadence::for_device(device.as_deref()).period(intervals);
        Self {
            source,
            device,
            period,
            capacity,
            view: Arc::new(RwLock::new(SeriesView::default())),
            metrics: None,
            on_registered: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SyncMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Called once per newly allocated series, after the cycle that created it
    /// has been applied.
    pub fn on_series_registered<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SeriesRegistered) + Send + Sync + 'static,
    {
        self.on_registered = Some(Box::new(callback));
        self
    }

    pub fn view(&self) -> Arc<RwLock<SeriesView>> {
        Arc::clone(&self.view)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn ticker(&self) -> IntervalTicker {
        IntervalTicker::new(self.period)
    }

    fn apply(&self, readings: Vec<SensorReading>) -> (usize, Vec<SeriesRegistered>) {
        let capacity = self.capacity.get();
        let mut points = 0;
        let mut unrecognized = 0;
        let mut registered = Vec::new();

        let mut view = self.view.write();
        view.registry.begin_cycle();
        for (position, reading) in readings.iter().enumerate() {
            let decoded = decode(&reading.value);
            if decoded.is_unrecognized() {
                trace!(sensor = %reading.name, value = %reading.value, "unrecognized value format");
                unrecognized += 1;
                continue;
            }
            points += decoded.len();
            registered.extend(view.registry.ingest(
                SensorKey(position),
                &reading.name,
                &decoded,
                capacity,
            ));
        }
        view.latest = readings;
        view.notice = None;
        let series_total = view.registry.series_count();
        drop(view);

        if let Some(metrics) = &self.metrics {
            metrics.polls.inc();
            metrics.points_ingested.inc_by(points as u64);
            metrics.unrecognized_values.inc_by(unrecognized);
            metrics.series_registered.set(series_total as i64);
        }
        (points, registered)
    }
}

#[async_trait]
impl Pipeline for TelemetryPoller {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn tick(&mut self) -> Result<TickReport, SyncError> {
        let readings = match self.source.sensor_values(self.device.as_deref()).await {
            Ok(readings) => readings,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.poll_failures.inc();
                }
                return Err(err.into());
            }
        };

        let (points, registered) = self.apply(readings);
        if let Some(callback) = &self.on_registered {
            for series in &registered {
                debug!(sensor = %series.sensor_name, label = %series.label, "series registered");
                callback(series);
            }
        }
        Ok(TickReport { applied: points })
    }

    fn report_failure(&mut self, notice: Notice) {
        self.view.write().notice = Some(notice);
    }
}
