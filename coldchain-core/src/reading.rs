//! Reading Validation and Ingestion Ordering
//!
//! The gate between raw telemetry and the pipeline. Checks, in order:
//!
//! 1. value sanity (NaN/inf)
//! 2. absolute physical temperature bounds (a -70 °C vaccine-fridge
//!    reading is a sensor fault, not a compliance event)
//! 3. timestamp skew against the reference clock
//! 4. sensor id resolution against the registry (unknown/retired reject)
//! 5. per-sensor timestamp ordering with dedup
//!
//! Duplicates by `(sensor_id, timestamp)` and slightly out-of-order
//! arrivals are absorbed as no-ops; only genuinely malformed or stale
//! input produces a rejection. Valid readings are forwarded unchanged,
//! enriched with the sensor's zone and vehicle for downstream stages.

use heapless::FnvIndexMap;

use crate::constants::limits::MAX_SENSORS;
use crate::constants::time::{ACCEPTED_AGE_MS, CLOCK_SKEW_TOLERANCE_MS, REORDER_TOLERANCE_MS};
use crate::constants::zones::{PHYSICAL_MAX_C, PHYSICAL_MIN_C};
use crate::errors::ValidationError;
use crate::events::InlineString;
use crate::registry::{SensorRegistry, SensorStatus};
use crate::time::Timestamp;

/// Geographic position attached to in-transit readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Raw reading as received from a sensor, before validation.
#[derive(Debug, Clone, Copy)]
pub struct RawReading {
    /// Reporting sensor id.
    pub sensor_id: InlineString,
    /// Temperature in Celsius.
    pub temperature: f32,
    /// Relative humidity percentage.
    pub humidity: f32,
    /// Battery level percentage.
    pub battery_level: f32,
    /// Position, present for in-transit sensors.
    pub position: Option<Position>,
    /// Reading timestamp (sensor clock, ms since epoch).
    pub timestamp: Timestamp,
}

/// Outcome of pushing a raw reading through the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Reading admitted; process it.
    Accepted,
    /// Same `(sensor_id, timestamp)` as the last accepted reading: a
    /// repeated delivery, not a new event. No-op.
    Duplicate,
    /// Out-of-order but within the reorder tolerance: absorbed without an
    /// error, not evaluated.
    Absorbed,
}

/// Gate configuration.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Absolute physical minimum temperature (°C).
    pub physical_min_c: f32,
    /// Absolute physical maximum temperature (°C).
    pub physical_max_c: f32,
    /// Maximum reading age relative to the reference clock (ms).
    pub accepted_age_ms: u64,
    /// Tolerated forward clock skew (ms).
    pub clock_skew_ms: u64,
    /// Per-sensor reorder absorption window (ms).
    pub reorder_tolerance_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            physical_min_c: PHYSICAL_MIN_C,
            physical_max_c: PHYSICAL_MAX_C,
            accepted_age_ms: ACCEPTED_AGE_MS,
            clock_skew_ms: CLOCK_SKEW_TOLERANCE_MS,
            reorder_tolerance_ms: REORDER_TOLERANCE_MS,
        }
    }
}

/// Reading validator with per-sensor ordering state.
///
/// Holds the last accepted timestamp per sensor so single-sensor streams
/// are processed in timestamp order regardless of arrival order.
pub struct ReadingGate {
    config: GateConfig,
    last_accepted: FnvIndexMap<InlineString, Timestamp, MAX_SENSORS>,
}

impl ReadingGate {
    /// Create a gate with default tolerances.
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Create a gate with explicit tolerances.
    pub fn with_config(config: GateConfig) -> Self {
        Self {
            config,
            last_accepted: FnvIndexMap::new(),
        }
    }

    /// Validate a raw reading against the registry at reference time `now`.
    ///
    /// `Ok(Admission::Accepted)` means the reading should flow on;
    /// `Duplicate`/`Absorbed` are silent no-ops; `Err` carries the
    /// rejection reason code.
    pub fn admit(
        &mut self,
        reading: &RawReading,
        registry: &SensorRegistry,
        now: Timestamp,
    ) -> Result<Admission, ValidationError> {
        // Value sanity before anything else
        if !reading.temperature.is_finite() || !reading.humidity.is_finite() {
            return Err(ValidationError::InvalidValue);
        }

        if reading.temperature < self.config.physical_min_c
            || reading.temperature > self.config.physical_max_c
        {
            return Err(ValidationError::OutOfPhysicalRange {
                value: reading.temperature,
                min: self.config.physical_min_c,
                max: self.config.physical_max_c,
            });
        }

        // Clock skew against the reference clock
        if reading.timestamp > now {
            let ahead = reading.timestamp - now;
            if ahead > self.config.clock_skew_ms {
                return Err(ValidationError::FutureTimestamp {
                    timestamp: reading.timestamp,
                    ahead_ms: ahead,
                });
            }
        } else {
            let behind = now - reading.timestamp;
            if behind > self.config.accepted_age_ms {
                return Err(ValidationError::StaleTimestamp {
                    timestamp: reading.timestamp,
                    behind_ms: behind,
                });
            }
        }

        // Sensor must be registered and active
        match registry.get(&reading.sensor_id) {
            None => return Err(ValidationError::UnknownSensor),
            Some(info) if info.status == SensorStatus::Retired => {
                return Err(ValidationError::RetiredSensor);
            }
            Some(_) => {}
        }

        // Per-sensor ordering and dedup
        if let Some(&last) = self.last_accepted.get(&reading.sensor_id) {
            if reading.timestamp == last {
                return Ok(Admission::Duplicate);
            }
            if reading.timestamp < last {
                let behind = last - reading.timestamp;
                if behind <= self.config.reorder_tolerance_ms {
                    return Ok(Admission::Absorbed);
                }
                return Err(ValidationError::StaleTimestamp {
                    timestamp: reading.timestamp,
                    behind_ms: behind,
                });
            }
        }

        // Table-full readings still validate; they just lose ordering
        // protection. The registry bounds sensors to the same capacity,
        // so in practice insertion only fails for unregistered load tests.
        let _ = self.last_accepted.insert(reading.sensor_id, reading.timestamp);

        Ok(Admission::Accepted)
    }
}

impl Default for ReadingGate {
    fn default() -> Self {
        Self::new()
    }
}
