//! Error Types for Ingestion and Alert-Engine Failures
//!
//! Errors are kept small and `Copy` so they can be returned from hot
//! ingestion paths and stored inline in rejection events. No heap
//! allocation: messages are `&'static str` only.
//!
//! Recovery policy per kind:
//! - `ValidationError`: recoverable, drop the single reading
//! - `InvariantViolation`: must never occur; logged, engine self-heals by
//!   merging to the earliest-opened alert
//! - duplicate / slightly out-of-order readings are absorbed before an
//!   error is ever constructed (see [`crate::reading::Admission`])

use thiserror_no_std::Error;

use crate::time::Timestamp;

/// Result type for ingestion validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reading rejection reasons - kept small for queue storage.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Temperature outside the absolute physical bound for any cold-chain
    /// sensor (not a compliance violation - a sensor fault).
    #[error("Temperature {value} outside physical range [{min}, {max}]")]
    OutOfPhysicalRange {
        /// The reported temperature in Celsius.
        value: f32,
        /// Lower physical bound.
        min: f32,
        /// Upper physical bound.
        max: f32,
    },

    /// Value is NaN or infinite.
    #[error("Invalid value: not a valid number")]
    InvalidValue,

    /// Timestamp ahead of the reference clock beyond skew tolerance.
    #[error("Timestamp {timestamp} is {ahead_ms}ms in the future")]
    FutureTimestamp {
        /// The offending timestamp.
        timestamp: Timestamp,
        /// How far ahead of the reference clock it is.
        ahead_ms: u64,
    },

    /// Timestamp older than the accepted skew window, or older than the
    /// last accepted reading beyond the reorder tolerance.
    #[error("Timestamp {timestamp} is stale by {behind_ms}ms")]
    StaleTimestamp {
        /// The offending timestamp.
        timestamp: Timestamp,
        /// How far behind the reference it is.
        behind_ms: u64,
    },

    /// Sensor id is not registered.
    #[error("Unknown sensor")]
    UnknownSensor,

    /// Sensor is registered but retired.
    #[error("Sensor retired")]
    RetiredSensor,

    /// Sensor id longer than the inline limit.
    #[error("Sensor id too long")]
    SensorIdTooLong,
}

impl ValidationError {
    /// Wire-level field the rejection refers to, for the `{field, issue}`
    /// rejection object.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::OutOfPhysicalRange { .. } | Self::InvalidValue => "temperature",
            Self::FutureTimestamp { .. } | Self::StaleTimestamp { .. } => "timestamp",
            Self::UnknownSensor | Self::RetiredSensor | Self::SensorIdTooLong => "sensor_id",
        }
    }

    /// Short machine-readable issue code.
    pub const fn issue(&self) -> &'static str {
        match self {
            Self::OutOfPhysicalRange { .. } => "out_of_physical_range",
            Self::InvalidValue => "not_a_number",
            Self::FutureTimestamp { .. } => "future_timestamp",
            Self::StaleTimestamp { .. } => "stale_timestamp",
            Self::UnknownSensor => "unknown_sensor",
            Self::RetiredSensor => "sensor_retired",
            Self::SensorIdTooLong => "id_too_long",
        }
    }
}

/// Alert-engine failures.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EngineError {
    /// More than one open alert was found for a sensor. Treated as a fatal
    /// bug signal: logged, then healed by merging to the earliest-opened
    /// alert. Surfaced so callers can count occurrences.
    #[error("Invariant violation: multiple open alerts for one sensor")]
    InvariantViolation,

    /// Per-sensor state table is full; the sensor cannot be tracked.
    #[error("Sensor state table full")]
    StateTableFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_wire_fields() {
        let err = ValidationError::OutOfPhysicalRange {
            value: 81.0,
            min: -50.0,
            max: 50.0,
        };
        assert_eq!(err.field(), "temperature");
        assert_eq!(err.issue(), "out_of_physical_range");

        assert_eq!(ValidationError::UnknownSensor.field(), "sensor_id");
    }
}
