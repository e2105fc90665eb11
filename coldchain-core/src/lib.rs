//! Core engine for ColdChain
//!
//! Turns raw temperature telemetry from medication-storage and in-transit
//! sensors into alert lifecycle events. The pipeline is deterministic:
//! every timed transition takes the clock as an explicit argument, so the
//! whole engine can be driven by a fixed test clock.
//!
//! Key constraints:
//! - Fixed memory: heapless collections, no allocation in the hot path
//! - One open alert per sensor, enforced on every transition
//! - Escalation is timer-driven and fires even when a sensor goes silent
//!
//! ```no_run
//! use coldchain_core::{thresholds::ThresholdTable, thresholds::Zone};
//!
//! let table = ThresholdTable::default();
//! let severity = table.get(Zone::Vaccines).classify(9.2);
//! // 9.2 °C is out of the 2-8 °C vaccine band but inside critical bounds
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod alert;
pub mod constants;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod queue;
pub mod reading;
pub mod registry;
pub mod stats;
pub mod thresholds;
pub mod time;

// Public API
pub use errors::{ValidationError, ValidationResult};
pub use events::{Event, InlineString, Severity};
pub use reading::{RawReading, ReadingGate, Admission};
pub use registry::{SensorRegistry, SensorInfo, SensorLocation, SensorStatus};
pub use thresholds::{Zone, ZoneThreshold, ThresholdTable};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
