//! Device presence derived from the receiver's periodic snapshots.
//!
//! Every snapshot replaces the previous view outright: a device that is
//! missing from the latest list is gone, and rows are computed purely from the
//! fields of the current record.

use crate::config::PollIntervals;
use crate::error::SyncError;
use crate::metrics::SyncMetrics;
use crate::schedule::{IntervalTicker, Notice, Pipeline, TickReport};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use swarm_client::{DeviceSnapshot, SwarmSource};
use time::OffsetDateTime;

/// Renders an uptime as `"Xh Ym Zs"`, `"Ym Zs"` or `"Zs"`, starting at the
/// largest nonzero unit.
pub fn format_uptime(ms: u64) -> String {
    let total = ms / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn format_last_seen(ms: u64) -> String {
    match ms {
        0..=999 => "just now".to_string(),
        1000..=59_999 => format!("{}s ago", ms / 1000),
        _ => format!("{}m ago", ms / 60_000),
    }
}

/// Presentation state of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub id: String,
    pub online: bool,
    /// Messages received from the device.
    pub counter: u64,
    pub uptime: String,
    pub last_seen: String,
    pub power_mw: Option<f64>,
}

impl DeviceRow {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            online: snapshot.online,
            counter: snapshot.counter,
            uptime: format_uptime(snapshot.uptime_ms),
            last_seen: format_last_seen(snapshot.last_seen_ms),
            power_mw: snapshot.power_mw,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.online {
            "Online"
        } else {
            "Offline"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwarmSummary {
    pub total: usize,
    pub online: usize,
}

impl fmt::Display for SwarmSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} devices ({} online)", self.total, self.online)
    }
}

/// Rows for `snapshots`, ascending by id (byte-wise, case-sensitive).
pub fn derive_rows(snapshots: &[DeviceSnapshot]) -> Vec<DeviceRow> {
    let mut rows: Vec<DeviceRow> = snapshots.iter().map(DeviceRow::from_snapshot).collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

/// Read side of the swarm subscription.
#[derive(Debug, Clone, Default)]
pub struct SwarmView {
    pub rows: Vec<DeviceRow>,
    pub summary: SwarmSummary,
    pub notice: Option<Notice>,
    /// When the rows were last replaced; `None` until the first snapshot.
    pub refreshed: Option<OffsetDateTime>,
}

impl SwarmView {
    pub fn from_snapshots(snapshots: &[DeviceSnapshot]) -> Self {
        let rows = derive_rows(snapshots);
        let summary = SwarmSummary {
            total: rows.len(),
            online: rows.iter().filter(|r| r.online).count(),
        };
        Self {
            rows,
            summary,
            notice: None,
            refreshed: Some(OffsetDateTime::now_utc()),
        }
    }

    pub fn row(&self, id: &str) -> Option<&DeviceRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}

pub struct LivenessTracker {
    source: Arc<dyn SwarmSource>,
    period: Duration,
    view: Arc<RwLock<SwarmView>>,
    metrics: Option<SyncMetrics>,
}

impl LivenessTracker {
    pub fn new(source: Arc<dyn SwarmSource>, intervals: &PollIntervals) -> Self {
        Self {
            source,
            period: intervals.swarm(),
            view: Arc::new(RwLock::new(SwarmView::default())),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SyncMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn view(&self) -> Arc<RwLock<SwarmView>> {
        Arc::clone(&self.view)
    }

    pub fn ticker(&self) -> IntervalTicker {
        IntervalTicker::new(self.period)
    }
}

#[async_trait]
impl Pipeline for LivenessTracker {
    fn name(&self) -> &'static str {
        "swarm"
    }

    async fn tick(&mut self) -> Result<TickReport, SyncError> {
        let snapshots = match self.source.devices().await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.device_fetch_failures.inc();
                }
                return Err(err.into());
            }
        };
        let next = SwarmView::from_snapshots(&snapshots);
        let summary = next.summary;
        *self.view.write() = next;

        if let Some(metrics) = &self.metrics {
            metrics.devices_online.set(summary.online as i64);
        }
        Ok(TickReport {
            applied: summary.total,
        })
    }

    fn report_failure(&mut self, notice: Notice) {
        self.view.write().notice = Some(notice);
    }
}
