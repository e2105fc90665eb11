//! Protocol Connectors for ColdChain
//!
//! Everything that moves bytes in or out of the controller:
//!
//! - [`mqtt`]: ingests reading payloads from a broker topic tree into
//!   the core pipeline. Per-sensor ordering is not a transport concern;
//!   the validation gate's staleness check handles interleaving.
//! - [`webhook`]: posts `temperature-alerts` and `delivery-updates`
//!   payloads with bounded exponential-backoff retries. Exhausted
//!   deliveries are counted and logged, never silently dropped.
//! - [`dispatch`]: the tokio loop wiring readings, timer ticks, and
//!   re-plan requests together.
//!
//! Connectors speak only `coldchain-schemas` payload types at the
//! boundary; domain values are built by the schema conversions.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "webhook")]
pub mod webhook;

#[cfg(feature = "dispatch")]
pub mod dispatch;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttError, MqttIngest};

#[cfg(feature = "webhook")]
pub use webhook::{WebhookConfig, WebhookError, WebhookSink, WebhookStats};

#[cfg(feature = "dispatch")]
pub use dispatch::{DispatchConfig, DispatchError, Dispatcher};

use thiserror::Error;

/// Common connector errors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Not connected to the remote endpoint.
    #[error("not connected")]
    NotConnected,

    /// Local buffer full.
    #[error("buffer full")]
    BufferFull,

    /// Operation timed out.
    #[error("timeout")]
    Timeout,

    /// Protocol-level failure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Bad connector configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Connection statistics common to all connectors.
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total messages sent successfully.
    pub messages_sent: u64,
    /// Total messages failed to send.
    pub messages_failed: u64,
    /// Total bytes sent.
    pub bytes_sent: u64,
    /// Number of reconnections.
    pub reconnections: u32,
}
