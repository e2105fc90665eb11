//! Time-Related Constants
//!
//! Skew windows, hold defaults, and conversion factors used by the
//! ingestion gate and the alert escalation engine.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

// ===== INGESTION SKEW WINDOWS =====

/// Maximum age of an accepted reading (milliseconds).
///
/// Readings older than this relative to the reference clock are rejected
/// as stale rather than evaluated against thresholds. One hour covers
/// store-and-forward gateways that batch uploads after connectivity gaps.
pub const ACCEPTED_AGE_MS: u64 = 60 * MS_PER_MINUTE;

/// Tolerated forward clock skew (milliseconds).
///
/// Sensor clocks drift; anything further in the future than this is a
/// misconfigured device, not drift.
pub const CLOCK_SKEW_TOLERANCE_MS: u64 = 30 * MS_PER_SECOND;

/// Per-sensor reorder tolerance (milliseconds).
///
/// A reading older than the last accepted one by at most this much is
/// absorbed silently; older than this is a staleness rejection.
pub const REORDER_TOLERANCE_MS: u64 = 5 * MS_PER_SECOND;

// ===== ALERT ENGINE DEFAULTS =====

/// Default escalation hold while Critical (milliseconds).
///
/// Default policy: an unresolved critical alert escalates after 15
/// minutes. Overridable per zone.
pub const DEFAULT_CRITICAL_HOLD_MS: u64 = 15 * MS_PER_MINUTE;

/// Default warning hold before a persisting warning becomes critical
/// (milliseconds).
pub const DEFAULT_WARNING_HOLD_MS: u64 = 15 * MS_PER_MINUTE;

/// Sensor liveness interval (milliseconds).
///
/// A sensor in a non-normal state that stays silent this long is treated
/// as critical: absence of data for a violating sensor is never safer
/// than the last known violation.
pub const DEFAULT_LIVENESS_INTERVAL_MS: u64 = 5 * MS_PER_MINUTE;
