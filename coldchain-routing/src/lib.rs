//! Route optimization and delivery tracking for ColdChain
//!
//! Plans pharmacy delivery routes for refrigerated vehicles and keeps
//! them current while deliveries run:
//!
//! - [`optimizer`]: builds a route visiting every stop once, seeded by
//!   priority, improved by bounded local search
//! - [`replan`]: re-plans the unvisited suffix of an active route; the
//!   completed and in-progress legs are frozen and never reordered
//! - [`tracker`]: per-vehicle delivery state, ETA estimates, and the
//!   replan request lifecycle (one in-flight request per vehicle,
//!   later triggers coalesce)
//!
//! The planner is deterministic: identical inputs produce identical
//! routes. Infeasibility is always reported, never silently dropped -
//! a stop that cannot meet its window shows up as a violation naming
//! the stop, and a search that runs out of budget returns its best
//! route flagged non-optimal.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cost;
pub mod errors;
pub mod geo;
pub mod optimizer;
pub mod replan;
pub mod tracker;
pub mod types;

pub use cost::{CostModel, TerrainKind, Weather, WeatherCondition};
pub use errors::RoutingError;
pub use optimizer::{Optimizer, PlanResult, PlanStatus, SearchBudget, Violation};
pub use replan::{insert_emergency, replan};
pub use tracker::{ApplyOutcome, DeliveryEvent, DeliveryTracker, ReplanRequest, ReplanTrigger};
pub use types::{PlannedStop, Route, Stop, TimeWindow, Vehicle};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
