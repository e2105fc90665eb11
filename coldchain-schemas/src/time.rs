//! Wire timestamp conversions.
//!
//! The wire carries RFC3339 strings; the pipeline carries millisecond
//! epochs. Formatting always emits millisecond precision with a `Z`
//! suffix so repeated serialization of the same event is byte-stable.

use chrono::{DateTime, SecondsFormat, Utc};

use coldchain_core::time::Timestamp;

use crate::SchemaError;

/// Format a millisecond epoch as an RFC3339 string.
pub fn format_rfc3339(ts: Timestamp) -> Result<String, SchemaError> {
    let ms = i64::try_from(ts).map_err(|_| SchemaError::TimestampOutOfRange)?;
    let dt = DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or(SchemaError::TimestampOutOfRange)?;
    Ok(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an RFC3339 string into a millisecond epoch.
///
/// Pre-epoch timestamps are rejected; the pipeline clock is unsigned.
pub fn parse_rfc3339(s: &str) -> Result<Timestamp, SchemaError> {
    let dt = DateTime::parse_from_rfc3339(s)?;
    let ms = dt.timestamp_millis();
    if ms < 0 {
        return Err(SchemaError::TimestampOutOfRange);
    }
    Ok(ms as u64)
}
