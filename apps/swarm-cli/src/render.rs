//! Plain-text rendering of the pipeline views.

use std::fmt::Write;
use swarm_client::{LogEntry, SensorGroup};
use telemetry_sync::{SeriesView, SwarmView};

pub fn devices(view: &SwarmView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.summary);
    if view.rows.is_empty() {
        out.push_str("No devices connected yet.\n");
    } else {
        let _ = writeln!(
            out,
            "{:<8} {:<18} {:>8} {:>12} {:>10} {:>9}",
            "STATUS", "MAC", "MESSAGES", "UPTIME", "LAST SEEN", "POWER"
        );
        for row in &view.rows {
            let power = row
                .power_mw
                .map(|mw| format!("{mw:.0} mW"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<8} {:<18} {:>8} {:>12} {:>10} {:>9}",
                row.status_label(),
                row.id,
                row.counter,
                row.uptime,
                row.last_seen,
                power
            );
        }
    }
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "! {}", notice.message);
    }
    out
}

/// Latest value of each sensor followed by its series windows.
pub fn series(view: &SeriesView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "cycle {}", view.registry.sequence());
    for (name, value) in view.display_values() {
        let _ = writeln!(out, "{name:<28} {value}");
    }
    for sensor in view.registry.sensors() {
        for series in sensor.series() {
            let buffer = series.buffer();
            let last = buffer
                .last()
                .map(|p| format!("{:.3}", p.y))
                .unwrap_or_else(|| "-".to_string());
            let name = if sensor.shows_legend() {
                format!("{}.{}", sensor.name(), series.label())
            } else {
                sensor.name().to_string()
            };
            let _ = writeln!(out, "  {name:<32} n={:<5} last={last}", buffer.len());
        }
    }
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "! {}", notice.message);
    }
    out
}

pub fn log_entry(entry: &LogEntry) -> String {
    let sender = entry.sender().unwrap_or("local");
    format!(
        "{} {:<7} [{}] {}",
        entry.timestamp, entry.level, sender, entry.message
    )
}

pub fn settings(groups: &[SensorGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "{}", group.sensor_name);
        for function in &group.functions {
            let state = if function.state { "on" } else { "off" };
            let _ = writeln!(out, "  [{state:>3}] {}", function.name);
        }
    }
    out
}
