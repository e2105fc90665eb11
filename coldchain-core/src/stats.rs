//! Rolling Per-Sensor Temperature Statistics
//!
//! A fixed-capacity window of recent readings per sensor, kept for the
//! delivery tracking query and operator summaries. Statistics are
//! recomputed from the window on demand rather than maintained
//! incrementally; the window is small enough that the scan is free.

use heapless::{FnvIndexMap, Vec};

use crate::constants::limits::{MAX_SENSORS, STATS_WINDOW_CAPACITY};
use crate::events::{InlineString, Severity};
use crate::time::Timestamp;

/// One retained reading.
#[derive(Debug, Clone, Copy)]
pub struct StatSample {
    /// Reading timestamp.
    pub timestamp: Timestamp,
    /// Temperature in Celsius.
    pub temperature: f32,
    /// Classification at the time of the reading.
    pub severity: Severity,
}

/// Summary statistics over one sensor's window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    /// Readings in the window.
    pub count: u32,
    /// Mean temperature.
    pub mean: f32,
    /// Minimum temperature.
    pub min: f32,
    /// Maximum temperature.
    pub max: f32,
    /// Fraction of readings classified Normal (0.0 to 1.0).
    pub compliance_rate: f32,
    /// Warning classifications in the window.
    pub warnings: u32,
    /// Critical classifications in the window.
    pub criticals: u32,
}

/// Rolling window for one sensor. Oldest sample is evicted when full.
#[derive(Debug, Clone)]
pub struct SensorWindow {
    samples: Vec<StatSample, STATS_WINDOW_CAPACITY>,
    next: usize,
}

impl SensorWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            next: 0,
        }
    }

    /// Record a sample, evicting the oldest if the window is full.
    pub fn record(&mut self, sample: StatSample) {
        if self.samples.is_full() {
            self.samples[self.next] = sample;
            self.next = (self.next + 1) % STATS_WINDOW_CAPACITY;
        } else {
            // Cannot fail, just checked
            let _ = self.samples.push(sample);
        }
    }

    /// Samples currently in the window, unordered.
    pub fn samples(&self) -> &[StatSample] {
        &self.samples
    }

    /// The most recent `limit` samples by timestamp, newest first.
    pub fn recent(&self, limit: usize) -> Vec<StatSample, STATS_WINDOW_CAPACITY> {
        let mut sorted: Vec<StatSample, STATS_WINDOW_CAPACITY> = Vec::new();
        for s in &self.samples {
            let _ = sorted.push(*s);
        }
        sorted.sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(limit);
        sorted
    }

    /// Compute summary statistics. `None` for an empty window.
    pub fn summary(&self) -> Option<StatsSummary> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sum = 0.0f32;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut normals = 0u32;
        let mut warnings = 0u32;
        let mut criticals = 0u32;

        for s in &self.samples {
            sum += s.temperature;
            min = min.min(s.temperature);
            max = max.max(s.temperature);
            match s.severity {
                Severity::Normal => normals += 1,
                Severity::Warning => warnings += 1,
                Severity::Critical => criticals += 1,
            }
        }

        let count = self.samples.len() as u32;
        Some(StatsSummary {
            count,
            mean: sum / count as f32,
            min,
            max,
            compliance_rate: normals as f32 / count as f32,
            warnings,
            criticals,
        })
    }
}

impl Default for SensorWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-sensor statistics store.
pub struct StatsStore {
    windows: FnvIndexMap<InlineString, SensorWindow, MAX_SENSORS>,
}

impl StatsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            windows: FnvIndexMap::new(),
        }
    }

    /// Record a classified reading. Silently drops readings for sensors
    /// beyond capacity; the registry bounds sensors to the same limit.
    pub fn record(
        &mut self,
        sensor_id: InlineString,
        timestamp: Timestamp,
        temperature: f32,
        severity: Severity,
    ) {
        let sample = StatSample {
            timestamp,
            temperature,
            severity,
        };
        if let Some(window) = self.windows.get_mut(&sensor_id) {
            window.record(sample);
            return;
        }
        let mut window = SensorWindow::new();
        window.record(sample);
        let _ = self.windows.insert(sensor_id, window);
    }

    /// The window for a sensor, if any readings were recorded.
    pub fn window(&self, sensor_id: &InlineString) -> Option<&SensorWindow> {
        self.windows.get(sensor_id)
    }

    /// Summary for a sensor, if any readings were recorded.
    pub fn summary(&self, sensor_id: &InlineString) -> Option<StatsSummary> {
        self.windows.get(sensor_id).and_then(|w| w.summary())
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    #[test]
    fn summary_over_mixed_readings() {
        let mut store = StatsStore::new();
        store.record(id("s1"), 1_000, 4.0, Severity::Normal);
        store.record(id("s1"), 2_000, 6.0, Severity::Normal);
        store.record(id("s1"), 3_000, 9.2, Severity::Warning);
        store.record(id("s1"), 4_000, 11.0, Severity::Critical);

        let s = store.summary(&id("s1")).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 7.55).abs() < 0.01);
        assert_eq!(s.min, 4.0);
        assert_eq!(s.max, 11.0);
        assert!((s.compliance_rate - 0.5).abs() < f32::EPSILON);
        assert_eq!(s.warnings, 1);
        assert_eq!(s.criticals, 1);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut w = SensorWindow::new();
        for i in 0..(STATS_WINDOW_CAPACITY + 5) {
            w.record(StatSample {
                timestamp: i as u64,
                temperature: i as f32,
                severity: Severity::Normal,
            });
        }

        assert_eq!(w.samples().len(), STATS_WINDOW_CAPACITY);
        // The five oldest were evicted
        assert!(w.samples().iter().all(|s| s.timestamp >= 5));
    }

    #[test]
    fn recent_returns_newest_first() {
        let mut w = SensorWindow::new();
        w.record(StatSample {
            timestamp: 1_000,
            temperature: 4.0,
            severity: Severity::Normal,
        });
        w.record(StatSample {
            timestamp: 3_000,
            temperature: 5.0,
            severity: Severity::Normal,
        });
        w.record(StatSample {
            timestamp: 2_000,
            temperature: 6.0,
            severity: Severity::Normal,
        });

        let recent = w.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, 3_000);
        assert_eq!(recent[1].timestamp, 2_000);
    }

    #[test]
    fn empty_window_has_no_summary() {
        let store = StatsStore::new();
        assert!(store.summary(&id("ghost")).is_none());
    }
}
