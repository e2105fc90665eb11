//! Medication Zone Thresholds and Classification
//!
//! Classification is a pure function of `(temperature, ZoneThreshold)` -
//! no clock, no history - so identical inputs always yield identical
//! results. Precedence: critical bounds are checked before the compliant
//! band, so a reading at or beyond a critical bound classifies Critical
//! even though it is also outside `min..max`.
//!
//! The threshold table is read-only at evaluation time. Updates replace
//! the whole table atomically ([`SharedThresholds`]); no reader ever
//! observes a half-updated set.

use crate::constants::time::{DEFAULT_CRITICAL_HOLD_MS, DEFAULT_WARNING_HOLD_MS};
use crate::constants::zones;
use crate::events::Severity;

/// Medication category with its own temperature band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Zone {
    /// WHO 2-8 °C vaccine band.
    Vaccines = 0,
    /// Insulin storage, wider heat excursion tolerance.
    Insulins = 1,
    /// Deep-frozen biologics.
    Biologics = 2,
    /// Controlled room temperature antibiotics.
    Antibiotics = 3,
}

impl Zone {
    /// All zones, in table order.
    pub const ALL: [Zone; 4] = [
        Zone::Vaccines,
        Zone::Insulins,
        Zone::Biologics,
        Zone::Antibiotics,
    ];

    /// Human-readable zone name.
    pub const fn name(&self) -> &'static str {
        match self {
            Zone::Vaccines => "vaccines",
            Zone::Insulins => "insulins",
            Zone::Biologics => "biologics",
            Zone::Antibiotics => "antibiotics",
        }
    }
}

/// Temperature band and hold durations for one medication zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneThreshold {
    /// Compliant band minimum (°C).
    pub min: f32,
    /// Compliant band maximum (°C).
    pub max: f32,
    /// Critical minimum (°C); at or below classifies Critical.
    pub critical_min: f32,
    /// Critical maximum (°C); at or above classifies Critical.
    pub critical_max: f32,
    /// How long a warning may persist before it becomes critical (ms).
    pub warning_hold_ms: u64,
    /// How long a critical alert may sit unresolved before escalating (ms).
    pub critical_hold_ms: u64,
}

impl ZoneThreshold {
    /// Build a threshold with default hold times, normalizing an inverted
    /// band.
    pub fn new(min: f32, max: f32, critical_min: f32, critical_max: f32) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        let (critical_min, critical_max) = if critical_min > critical_max {
            (critical_max, critical_min)
        } else {
            (critical_min, critical_max)
        };

        Self {
            min,
            max,
            critical_min,
            critical_max,
            warning_hold_ms: DEFAULT_WARNING_HOLD_MS,
            critical_hold_ms: DEFAULT_CRITICAL_HOLD_MS,
        }
    }

    /// Override hold durations.
    pub fn with_holds(mut self, warning_hold_ms: u64, critical_hold_ms: u64) -> Self {
        self.warning_hold_ms = warning_hold_ms;
        self.critical_hold_ms = critical_hold_ms;
        self
    }

    /// Classify a temperature against this band.
    ///
    /// Pure and deterministic. Critical bounds take precedence over the
    /// compliant band.
    pub fn classify(&self, temperature: f32) -> Severity {
        if temperature <= self.critical_min || temperature >= self.critical_max {
            Severity::Critical
        } else if temperature < self.min || temperature > self.max {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// The bound a non-normal temperature violated, for alert payloads.
    ///
    /// Returns the compliant-band edge for warnings and the critical edge
    /// for critical readings; the compliant maximum for normal readings.
    pub fn violated_bound(&self, temperature: f32) -> f32 {
        match self.classify(temperature) {
            Severity::Critical => {
                if temperature <= self.critical_min {
                    self.critical_min
                } else {
                    self.critical_max
                }
            }
            Severity::Warning => {
                if temperature < self.min {
                    self.min
                } else {
                    self.max
                }
            }
            Severity::Normal => self.max,
        }
    }
}

/// Read-only table mapping each zone to its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdTable {
    entries: [ZoneThreshold; 4],
}

impl ThresholdTable {
    /// Build a table from explicit per-zone thresholds (table order:
    /// vaccines, insulins, biologics, antibiotics).
    pub const fn from_entries(entries: [ZoneThreshold; 4]) -> Self {
        Self { entries }
    }

    /// Get the threshold for a zone.
    pub fn get(&self, zone: Zone) -> ZoneThreshold {
        self.entries[zone as usize]
    }

    /// Replace one zone's threshold, returning the updated table.
    ///
    /// The table is `Copy`; callers swap the whole updated table in, never
    /// edit in place.
    pub fn with_zone(mut self, zone: Zone, threshold: ZoneThreshold) -> Self {
        self.entries[zone as usize] = threshold;
        self
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        use zones::*;
        Self {
            entries: [
                ZoneThreshold::new(
                    VACCINES_MIN_C,
                    VACCINES_MAX_C,
                    VACCINES_CRITICAL_MIN_C,
                    VACCINES_CRITICAL_MAX_C,
                ),
                ZoneThreshold::new(
                    INSULINS_MIN_C,
                    INSULINS_MAX_C,
                    INSULINS_CRITICAL_MIN_C,
                    INSULINS_CRITICAL_MAX_C,
                ),
                ZoneThreshold::new(
                    BIOLOGICS_MIN_C,
                    BIOLOGICS_MAX_C,
                    BIOLOGICS_CRITICAL_MIN_C,
                    BIOLOGICS_CRITICAL_MAX_C,
                ),
                ZoneThreshold::new(
                    ANTIBIOTICS_MIN_C,
                    ANTIBIOTICS_MAX_C,
                    ANTIBIOTICS_CRITICAL_MIN_C,
                    ANTIBIOTICS_CRITICAL_MAX_C,
                ),
            ],
        }
    }
}

/// Shared threshold table with atomic whole-table swap (std only).
///
/// Readers clone an `Arc` to the current table and evaluate against that
/// snapshot; a writer installs a new `Arc`. A reader mid-evaluation keeps
/// its snapshot - there is no torn state to observe.
#[cfg(feature = "std")]
pub struct SharedThresholds {
    current: std::sync::RwLock<std::sync::Arc<ThresholdTable>>,
}

#[cfg(feature = "std")]
impl SharedThresholds {
    /// Create with an initial table.
    pub fn new(table: ThresholdTable) -> Self {
        Self {
            current: std::sync::RwLock::new(std::sync::Arc::new(table)),
        }
    }

    /// Snapshot the current table.
    pub fn load(&self) -> std::sync::Arc<ThresholdTable> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replace the whole table.
    pub fn store(&self, table: ThresholdTable) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = std::sync::Arc::new(table);
    }
}

#[cfg(feature = "std")]
impl Default for SharedThresholds {
    fn default() -> Self {
        Self::new(ThresholdTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vaccine_band_classification() {
        let t = ThresholdTable::default().get(Zone::Vaccines);

        assert_eq!(t.classify(5.0), Severity::Normal);
        assert_eq!(t.classify(2.0), Severity::Normal);
        assert_eq!(t.classify(8.0), Severity::Normal);
        assert_eq!(t.classify(9.2), Severity::Warning);
        assert_eq!(t.classify(1.0), Severity::Warning);
        assert_eq!(t.classify(10.0), Severity::Critical);
        assert_eq!(t.classify(0.0), Severity::Critical);
        assert_eq!(t.classify(-3.0), Severity::Critical);
    }

    #[test]
    fn critical_precedence_over_warning() {
        // 10.0 is > max (8.0) and >= critical_max (10.0); critical wins
        let t = ZoneThreshold::new(2.0, 8.0, 0.0, 10.0);
        assert_eq!(t.classify(10.0), Severity::Critical);
    }

    #[test]
    fn violated_bound_picks_nearest_edge() {
        let t = ZoneThreshold::new(2.0, 8.0, 0.0, 10.0);
        assert_eq!(t.violated_bound(9.2), 8.0);
        assert_eq!(t.violated_bound(1.5), 2.0);
        assert_eq!(t.violated_bound(11.0), 10.0);
        assert_eq!(t.violated_bound(-1.0), 0.0);
    }

    #[test]
    fn inverted_band_normalized() {
        let t = ZoneThreshold::new(8.0, 2.0, 10.0, 0.0);
        assert_eq!(t.min, 2.0);
        assert_eq!(t.critical_max, 10.0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn shared_table_swaps_whole() {
        let shared = SharedThresholds::default();
        let before = shared.load();

        let updated = ThresholdTable::default().with_zone(
            Zone::Vaccines,
            ZoneThreshold::new(2.0, 8.0, 0.0, 10.0).with_holds(900_000, 120_000),
        );
        shared.store(updated);

        // Old snapshot unchanged, new snapshot sees the swap
        assert_eq!(
            before.get(Zone::Vaccines).critical_hold_ms,
            ThresholdTable::default().get(Zone::Vaccines).critical_hold_ms
        );
        assert_eq!(shared.load().get(Zone::Vaccines).critical_hold_ms, 120_000);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn classification_is_deterministic(temp in -60.0f32..60.0) {
                let t = ThresholdTable::default().get(Zone::Vaccines);
                prop_assert_eq!(t.classify(temp), t.classify(temp));
            }

            #[test]
            fn classification_partitions_the_line(temp in -60.0f32..60.0) {
                let t = ThresholdTable::default().get(Zone::Vaccines);
                match t.classify(temp) {
                    Severity::Normal => {
                        prop_assert!(temp >= t.min && temp <= t.max);
                    }
                    Severity::Warning => {
                        prop_assert!(temp < t.min || temp > t.max);
                        prop_assert!(temp > t.critical_min && temp < t.critical_max);
                    }
                    Severity::Critical => {
                        prop_assert!(temp <= t.critical_min || temp >= t.critical_max);
                    }
                }
            }
        }
    }
}
