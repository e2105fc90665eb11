//! Time management for the cold-chain controller
//!
//! Provides a clock abstraction so every timed transition in the alert
//! engine (hold expiry, escalation, liveness) can be driven either by the
//! system clock or by a fixed test clock. Nothing in the core reads the
//! wall clock implicitly.

/// Timestamp in milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of time for the system.
pub trait TimeSource {
    /// Get current timestamp in milliseconds.
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic).
    fn is_wall_clock(&self) -> bool;
}

/// System time source (requires std).
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing.
///
/// Every escalation and hold-expiry test in this workspace advances one of
/// these instead of sleeping.
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Create a fixed clock at the given timestamp.
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Set the clock to an absolute timestamp.
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock by `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Delta between two timestamps, saturating at zero.
pub fn delta_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
