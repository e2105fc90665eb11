//! Constants for ColdChain Core
//!
//! Centralized, documented constants used throughout the controller. All
//! numeric values live here with their source and rationale.
//!
//! ## Organization
//!
//! - **Zones**: medication temperature bands and hold times
//! - **Time**: time conversions, skew windows, timer intervals
//! - **Limits**: fixed-capacity table and buffer sizes

/// Medication zone temperature bands and hold durations.
pub mod zones;

/// Time conversions, skew and liveness intervals.
pub mod time;

/// Fixed-capacity limits for heapless tables and queues.
pub mod limits;

pub use time::{
    MS_PER_SECOND, MS_PER_MINUTE, ACCEPTED_AGE_MS, CLOCK_SKEW_TOLERANCE_MS,
    REORDER_TOLERANCE_MS, DEFAULT_LIVENESS_INTERVAL_MS, DEFAULT_CRITICAL_HOLD_MS,
    DEFAULT_WARNING_HOLD_MS,
};

pub use limits::{
    MAX_SENSORS, MAX_PENDING_TIMERS, DEFAULT_EVENT_QUEUE_SIZE, MAX_PIPELINE_STAGES,
    STATS_WINDOW_CAPACITY,
};

pub use zones::{PHYSICAL_MIN_C, PHYSICAL_MAX_C};
