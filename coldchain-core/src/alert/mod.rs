//! Alert Escalation Engine
//!
//! A per-sensor state machine that turns a sequence of threshold
//! classifications into alert lifecycle events:
//!
//! ```text
//! Normal → Warning → Critical → Escalated → Resolved (→ Normal)
//! ```
//!
//! The core invariant: at most one open alert per sensor, checked on
//! every transition. Escalation is an explicitly scheduled timer keyed by
//! `(sensor_id, alert_id)` with cancel-on-resolve semantics - never an ad
//! hoc boolean - so concurrent escalation/resolution races cannot
//! double-fire.
//!
//! Module layout:
//! - this file: alert record and sensor phase types
//! - [`timers`]: deadline set for hold/escalation/resolve timers
//! - [`engine`]: the state machine itself

pub mod engine;
pub mod timers;

pub use engine::{EngineOutput, EscalationEngine};
pub use timers::{TimerKind, TimerQueue};

use crate::events::{AlertId, InlineString, Severity};
use crate::time::Timestamp;

/// An alert record. Exactly one may be open per sensor.
#[derive(Debug, Clone, Copy)]
pub struct Alert {
    /// Engine-unique alert id.
    pub id: AlertId,
    /// Sensor the alert belongs to.
    pub sensor_id: InlineString,
    /// When the alert was opened.
    pub opened_at: Timestamp,
    /// Current severity (Warning or Critical).
    pub severity: Severity,
    /// When the alert escalated, if it has.
    pub escalated_at: Option<Timestamp>,
    /// When the alert resolved, if it has.
    pub resolved_at: Option<Timestamp>,
    /// Last reading that confirmed the violation.
    pub last_seen: Timestamp,
    /// Last observed temperature.
    pub last_temperature: f32,
    /// The zone bound the triggering reading violated.
    pub threshold: f32,
}

impl Alert {
    /// Whether the alert is still open.
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// The non-normal phase a resolving sensor would fall back to if its
/// readings leave the compliant band again before the resolve hold ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorPhase {
    /// Was in Warning.
    Warning {
        /// Since when.
        since: Timestamp,
    },
    /// Was in Critical.
    Critical {
        /// Since when.
        since: Timestamp,
    },
    /// Was already Escalated.
    Escalated {
        /// Since when.
        since: Timestamp,
    },
}

/// Per-sensor state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// In the compliant band, no open alert.
    Normal,
    /// Outside the band, inside critical bounds.
    Warning {
        /// Since when.
        since: Timestamp,
    },
    /// At or beyond a critical bound.
    Critical {
        /// Since when.
        since: Timestamp,
    },
    /// Critical hold elapsed without resolution.
    Escalated {
        /// Since when.
        since: Timestamp,
    },
    /// A normal reading was observed; the alert closes if the hold
    /// elapses without reversion.
    Resolving {
        /// Phase to fall back to on reversion.
        prior: PriorPhase,
        /// When the normal reading arrived.
        normal_since: Timestamp,
    },
}

impl Phase {
    /// Whether the last confirmed state was a violation. Resolving counts
    /// as non-normal for the liveness watchdog only once reverted, since
    /// its last reading was compliant.
    pub fn is_violating(&self) -> bool {
        matches!(
            self,
            Phase::Warning { .. } | Phase::Critical { .. } | Phase::Escalated { .. }
        )
    }
}
