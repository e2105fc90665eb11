//! Routing Failure Types
//!
//! Planning failures are soft: the optimizer always returns its best
//! route, flagged via [`crate::optimizer::PlanStatus`]. These errors
//! cover the hard cases - tracker lookups and capacity limits - plus
//! the named planning outcomes for callers that want a `Result`.

use coldchain_core::events::InlineString;
use thiserror_no_std::Error;

/// Routing and tracking errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingError {
    /// No feasible schedule exists including this stop.
    #[error("no feasible schedule for stop {stop}")]
    RouteInfeasible {
        /// The stop that cannot be scheduled.
        stop: InlineString,
    },

    /// The local search hit its move budget before reaching a local
    /// optimum; the returned route is valid but possibly improvable.
    #[error("optimization move budget exhausted")]
    OptimizationBudgetExceeded,

    /// Vehicle id is not registered with the tracker.
    #[error("unknown vehicle")]
    UnknownVehicle,

    /// The vehicle has no active route.
    #[error("vehicle has no active route")]
    NoActiveRoute,

    /// Route or vehicle table is at capacity.
    #[error("capacity table full")]
    TableFull,
}
