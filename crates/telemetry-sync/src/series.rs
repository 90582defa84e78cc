//! Session-scoped registry of dynamically discovered series.

use crate::decode::Decoded;
use crate::window::{Point, WindowedBuffer};
use std::collections::BTreeMap;

/// Identifies a sensor by its display position in the readings list.
///
/// Stable for a session as long as the receiver keeps its ordering; never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorKey(pub usize);

/// Announcement of a newly allocated series, for legend/renderer setup.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRegistered {
    pub key: SensorKey,
    pub sensor_name: String,
    /// Position of the series within its sensor, in registration order.
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    label: String,
    buffer: WindowedBuffer,
}

impl Series {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn buffer(&self) -> &WindowedBuffer {
        &self.buffer
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSeries {
    key: SensorKey,
    name: String,
    series: Vec<Series>,
}

impl SensorSeries {
    pub fn key(&self) -> SensorKey {
        self.key
    }

    /// Name from the most recent reading at this position.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn find(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }

    pub fn shows_legend(&self) -> bool {
        self.series.len() > 1
    }
}

/// All series of a session plus the shared poll-cycle counter.
///
/// Series are only ever added; a label that stops appearing keeps its buffer
/// (and its history) until the registry is dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesRegistry {
    sensors: BTreeMap<SensorKey, SensorSeries>,
    sequence: u64,
}

impl SeriesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the cycle counter and returns the `x` value for this cycle.
    /// Called once per successful poll, shared by every sensor in it.
    pub fn begin_cycle(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// `x` value of the most recent cycle (0 before the first one).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Appends one point per decoded component at the current sequence,
    /// allocating series on first sight of a label. Returns the series that
    /// were allocated by this call, in component order.
    pub fn ingest(
        &mut self,
        key: SensorKey,
        sensor_name: &str,
        decoded: &Decoded,
        capacity: usize,
    ) -> Vec<SeriesRegistered> {
        let mut registered = Vec::new();
        if decoded.is_empty() {
            return registered;
        }

        let x = self.sequence;
        let sensor = self.sensors.entry(key).or_insert_with(|| SensorSeries {
            key,
            name: sensor_name.to_string(),
            series: Vec::new(),
        });
        if sensor.name != sensor_name {
            sensor.name = sensor_name.to_string();
        }

        for component in &decoded.components {
            let position = match sensor.series.iter().position(|s| s.label == component.label) {
                Some(position) => position,
                None => {
                    sensor.series.push(Series {
                        label: component.label.clone(),
                        buffer: WindowedBuffer::new(),
                    });
                    let index = sensor.series.len() - 1;
                    registered.push(SeriesRegistered {
                        key,
                        sensor_name: sensor.name.clone(),
                        index,
                        label: component.label.clone(),
                    });
                    index
                }
            };
            sensor.series[position].buffer.push(
                Point {
                    x,
                    y: component.value,
                },
                capacity,
            );
        }
        registered
    }

    pub fn sensor(&self, key: SensorKey) -> Option<&SensorSeries> {
        self.sensors.get(&key)
    }

    pub fn series(&self, key: SensorKey, label: &str) -> Option<&Series> {
        self.sensor(key).and_then(|s| s.find(label))
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorSeries> {
        self.sensors.values()
    }

    pub fn series_count(&self) -> usize {
        self.sensors.values().map(|s| s.series.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    #[test]
    fn test_first_sight_registers_in_component_order() {
        let mut registry = SeriesRegistry::new();
        registry.begin_cycle();
        let registered = registry.ingest(SensorKey(0), "Accel", &decode("x:1,y:2,z:3"), 100);

        let labels: Vec<(usize, &str)> = registered
            .iter()
            .map(|r| (r.index, r.label.as_str()))
            .collect();
        assert_eq!(labels, vec![(0, "x"), (1, "y"), (2, "z")]);
        assert!(registry.sensor(SensorKey(0)).unwrap().shows_legend());

        registry.begin_cycle();
        let again = registry.ingest(SensorKey(0), "Accel", &decode("x:4,y:5,z:6"), 100);
        assert!(again.is_empty());
        assert_eq!(registry.series_count(), 3);
    }

    #[test]
    fn test_points_share_cycle_sequence() {
        let mut registry = SeriesRegistry::new();
        for cycle in 1..=3u64 {
            let x = registry.begin_cycle();
            assert_eq!(x, cycle);
            registry.ingest(SensorKey(0), "Temperature", &decode("21.5"), 100);
            registry.ingest(SensorKey(1), "Accel", &decode("x:1,y:2"), 100);
        }

        let temp = registry.series(SensorKey(0), "value").unwrap();
        let accel_y = registry.series(SensorKey(1), "y").unwrap();
        let temp_x: Vec<u64> = temp.buffer().iter().map(|p| p.x).collect();
        let accel_x: Vec<u64> = accel_y.buffer().iter().map(|p| p.x).collect();
        assert_eq!(temp_x, vec![1, 2, 3]);
        assert_eq!(temp_x, accel_x);
    }

    #[test]
    fn test_registration_is_monotonic() {
        let mut registry = SeriesRegistry::new();
        registry.begin_cycle();
        registry.ingest(SensorKey(0), "Accel", &decode("x:1,y:2"), 100);

        // The next reading drops `y` and introduces `z`.
        registry.begin_cycle();
        let registered = registry.ingest(SensorKey(0), "Accel", &decode("x:3,z:9"), 100);
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].label, "z");
        assert_eq!(registered[0].index, 2);

        let sensor = registry.sensor(SensorKey(0)).unwrap();
        let labels: Vec<&str> = sensor.series().iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["x", "y", "z"]);
        assert_eq!(sensor.find("y").unwrap().buffer().len(), 1);
        assert_eq!(sensor.find("x").unwrap().buffer().len(), 2);
    }

    #[test]
    fn test_empty_decode_registers_nothing() {
        let mut registry = SeriesRegistry::new();
        registry.begin_cycle();
        assert!(registry
            .ingest(SensorKey(0), "Status", &decode("ok"), 100)
            .is_empty());
        assert!(registry.sensor(SensorKey(0)).is_none());
    }

    #[test]
    fn test_capacity_applies_per_append() {
        let mut registry = SeriesRegistry::new();
        for _ in 0..80 {
            registry.begin_cycle();
            registry.ingest(SensorKey(0), "Light", &decode("7"), 80);
        }
        assert_eq!(registry.series(SensorKey(0), "value").unwrap().buffer().len(), 80);

        registry.begin_cycle();
        registry.ingest(SensorKey(0), "Light", &decode("7"), 50);
        let buffer = registry.series(SensorKey(0), "value").unwrap().buffer();
        assert_eq!(buffer.len(), 50);
        assert_eq!(buffer.last().map(|p| p.x), Some(81));
    }
}
