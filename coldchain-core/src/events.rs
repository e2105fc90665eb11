//! Event Types for the Sensor-to-Alert Pipeline
//!
//! Events are the only coupling between pipeline stages: the ingestion
//! gate emits accepted/rejected readings, the threshold stage attaches a
//! classification, and the escalation engine emits alert lifecycle events.
//! A `ReplanNeeded` event crosses over to the delivery tracker when an
//! escalated sensor rides on a vehicle.
//!
//! ## Memory Model
//!
//! Events are sized for queue storage on constrained gateways:
//! - fixed-size, stack-allocated, no heap
//! - sensor and vehicle ids are inline strings (no references)
//! - every variant carries its own timestamp

use crate::errors::ValidationError;
use crate::reading::RawReading;
use crate::thresholds::Zone;
use crate::time::Timestamp;
use core::fmt;

/// Maximum length for inline sensor/vehicle ids.
pub const MAX_INLINE_ID: usize = 23;

/// Compliance classification of a reading against its zone band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    /// Inside the compliant band.
    Normal = 0,
    /// Outside the compliant band but inside critical bounds.
    Warning = 1,
    /// At or beyond a critical bound.
    Critical = 2,
}

impl Severity {
    /// Wire-level status string used in webhook payloads.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Alert lifecycle status carried on alert events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertStatus {
    /// Alert opened at warning severity.
    Warning = 0,
    /// Alert at critical severity.
    Critical = 1,
    /// Alert escalated after the critical hold elapsed.
    Escalated = 2,
    /// Alert closed.
    Resolved = 3,
}

impl AlertStatus {
    /// Wire-level status string used in webhook payloads.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Warning => "warning",
            AlertStatus::Critical => "critical",
            AlertStatus::Escalated => "escalated",
            AlertStatus::Resolved => "resolved",
        }
    }
}

/// System event types for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemEventKind {
    /// Pipeline started.
    PipelineStart = 0,
    /// Pipeline stopped.
    PipelineStop = 1,
    /// Event queue overflow.
    QueueOverflow = 2,
    /// Alert invariant self-heal occurred.
    InvariantHealed = 3,
    /// Sensor state table exhausted.
    StateTableFull = 4,
}

/// Inline string for sensor and vehicle ids.
///
/// Avoids heap allocation for the id lengths telemetry actually uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InlineString {
    len: u8,
    data: [u8; MAX_INLINE_ID],
}

impl InlineString {
    /// Create from a string slice. Returns `None` if the id is too long.
    pub fn new(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_INLINE_ID {
            return None;
        }

        let mut data = [0u8; MAX_INLINE_ID];
        data[..bytes.len()].copy_from_slice(bytes);

        Some(Self {
            len: bytes.len() as u8,
            data,
        })
    }

    /// Get as string slice.
    pub fn as_str(&self) -> &str {
        // Only valid UTF-8 is stored by new()
        core::str::from_utf8(&self.data[..self.len as usize])
            .expect("InlineString contains invalid UTF-8")
    }
}

impl fmt::Debug for InlineString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for InlineString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for InlineString {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InlineString {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// Monotonically increasing alert identifier, unique per engine instance.
pub type AlertId = u32;

/// Main event type for the processing pipeline.
#[derive(Debug, Clone)]
pub enum Event {
    /// A raw reading as received from a connector, not yet validated.
    /// Consumed by the validation stage.
    ReadingReceived {
        /// The unvalidated reading.
        reading: RawReading,
    },

    /// A reading admitted by the ingestion gate, enriched with the
    /// sensor's zone and (for in-transit sensors) its vehicle.
    ReadingAccepted {
        /// Sensor identifier.
        sensor_id: InlineString,
        /// Medication zone the sensor monitors.
        zone: Zone,
        /// Temperature in Celsius.
        temperature: f32,
        /// Relative humidity percentage.
        humidity: f32,
        /// Reading timestamp.
        timestamp: Timestamp,
        /// Vehicle the sensor rides on, if in transit.
        vehicle: Option<InlineString>,
    },

    /// A reading rejected by the ingestion gate. Carries the reason code,
    /// never raises an alert.
    ReadingRejected {
        /// Sensor identifier as reported (may be unknown).
        sensor_id: InlineString,
        /// Rejection reason.
        reason: ValidationError,
        /// Reading timestamp as reported.
        timestamp: Timestamp,
    },

    /// Threshold classification of an accepted reading.
    Classified {
        /// Sensor identifier.
        sensor_id: InlineString,
        /// Medication zone.
        zone: Zone,
        /// Classification outcome.
        severity: Severity,
        /// Temperature in Celsius.
        temperature: f32,
        /// Reading timestamp.
        timestamp: Timestamp,
        /// Vehicle the sensor rides on, if in transit.
        vehicle: Option<InlineString>,
    },

    /// An alert was opened for a sensor.
    AlertRaised {
        /// Alert identifier.
        alert_id: AlertId,
        /// Sensor the alert belongs to.
        sensor_id: InlineString,
        /// Severity at open.
        status: AlertStatus,
        /// Temperature that triggered the alert.
        temperature: f32,
        /// The violated zone bound.
        threshold: f32,
        /// Transition time.
        timestamp: Timestamp,
    },

    /// An open alert changed severity or escalated.
    AlertEscalated {
        /// Alert identifier.
        alert_id: AlertId,
        /// Sensor the alert belongs to.
        sensor_id: InlineString,
        /// New status (Critical or Escalated).
        status: AlertStatus,
        /// Last observed temperature.
        temperature: f32,
        /// The violated zone bound.
        threshold: f32,
        /// Transition time.
        timestamp: Timestamp,
    },

    /// An open alert was resolved.
    AlertResolved {
        /// Alert identifier.
        alert_id: AlertId,
        /// Sensor the alert belonged to.
        sensor_id: InlineString,
        /// Last observed temperature.
        temperature: f32,
        /// Transition time.
        timestamp: Timestamp,
    },

    /// An escalated alert concerns a sensor aboard an in-transit vehicle;
    /// the delivery tracker should consider an emergency re-plan.
    ReplanNeeded {
        /// Vehicle carrying the sensor.
        vehicle: InlineString,
        /// Sensor whose alert escalated.
        sensor_id: InlineString,
        /// The escalated alert.
        alert_id: AlertId,
        /// Transition time.
        timestamp: Timestamp,
    },

    /// System events for monitoring.
    System {
        /// Type of system event.
        kind: SystemEventKind,
        /// When the event occurred.
        timestamp: Timestamp,
        /// Event-specific details (bit-packed).
        details: u32,
    },
}

impl Event {
    /// Get event timestamp.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::ReadingReceived { reading } => reading.timestamp,
            Event::ReadingAccepted { timestamp, .. } => *timestamp,
            Event::ReadingRejected { timestamp, .. } => *timestamp,
            Event::Classified { timestamp, .. } => *timestamp,
            Event::AlertRaised { timestamp, .. } => *timestamp,
            Event::AlertEscalated { timestamp, .. } => *timestamp,
            Event::AlertResolved { timestamp, .. } => *timestamp,
            Event::ReplanNeeded { timestamp, .. } => *timestamp,
            Event::System { timestamp, .. } => *timestamp,
        }
    }

    /// Get sensor id if applicable.
    pub fn sensor_id(&self) -> Option<&str> {
        match self {
            Event::ReadingReceived { reading } => Some(reading.sensor_id.as_str()),
            Event::ReadingAccepted { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::ReadingRejected { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::Classified { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::AlertRaised { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::AlertEscalated { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::AlertResolved { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::ReplanNeeded { sensor_id, .. } => Some(sensor_id.as_str()),
            Event::System { .. } => None,
        }
    }

    /// True for alert lifecycle events (exactly the ones that fan out as
    /// `temperature-alerts` webhooks).
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            Event::AlertRaised { .. } | Event::AlertEscalated { .. } | Event::AlertResolved { .. }
        )
    }

    /// Event priority for queue management. Lower is more urgent.
    pub fn priority(&self) -> u8 {
        match self {
            Event::System { .. } => 0,
            Event::ReplanNeeded { .. } => 1,
            Event::AlertEscalated { .. } => 2,
            Event::AlertRaised { .. } | Event::AlertResolved { .. } => 3,
            Event::Classified { .. } => 4,
            Event::ReadingReceived { .. }
            | Event::ReadingAccepted { .. }
            | Event::ReadingRejected { .. } => 5,
        }
    }
}
