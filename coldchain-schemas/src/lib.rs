//! JSON Wire Contract for ColdChain
//!
//! Serde payload types for everything that crosses the process
//! boundary: sensor ingestion, route optimization requests and
//! responses, delivery tracking queries, and the outbound webhook
//! streams. Field names here are the external contract - renaming one
//! is a breaking change for every integration partner.
//!
//! Timestamps are RFC3339 strings on the wire and millisecond epochs
//! internally; [`time`] holds the conversions. Payload types convert
//! to and from the `coldchain-core` and `coldchain-routing` domain
//! types, so connectors never build domain values by hand.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ingestion;
pub mod routing;
pub mod time;
pub mod tracking;
pub mod webhooks;

use thiserror_no_std::Error;

pub use ingestion::{LocationPayload, ReadingPayload, RejectionPayload};
pub use routing::{
    OptimizeRequest, OptimizeResponse, RouteStopPayload, StopPayload, WeatherPayload,
    WindowPayload,
};
pub use tracking::{DeliveryStatus, TemperatureReadingPayload, TrackingStatus};
pub use webhooks::{DeliveryUpdatePayload, TemperatureAlertPayload};

/// Errors converting between wire payloads and domain types.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Timestamp string is not valid RFC3339.
    #[error("invalid RFC3339 timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    /// Timestamp cannot be represented as a millisecond epoch.
    #[error("timestamp out of representable range")]
    TimestampOutOfRange,

    /// An id exceeds the inline id limit used throughout the pipeline.
    #[error("id too long for inline storage: {0}")]
    IdTooLong(String),

    /// Weather condition string is not one of clear/rain/snow.
    #[error("unknown weather condition: {0}")]
    UnknownWeatherCondition(String),

    /// More stops in a request than a route can hold.
    #[error("too many stops in request: {0}")]
    TooManyStops(usize),

    /// JSON parse or serialize failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
