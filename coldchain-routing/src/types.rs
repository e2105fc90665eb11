//! Routing Domain Types
//!
//! A [`Stop`] is a pharmacy delivery with a hard time window and a
//! priority; a [`Route`] is an ordered schedule of stops for one
//! vehicle. Routes are versioned: every re-plan increments `version`,
//! and the tracker uses the version to reject results for a plan that
//! was superseded while the optimizer ran.

use heapless::Vec;

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_core::time::Timestamp;

/// Maximum stops on one route.
pub const MAX_STOPS: usize = 32;

/// Priority multiplier for stops flagged by an emergency signal.
/// Priorities run 1-10, so a boosted stop always outranks a normal one.
pub const EMERGENCY_PRIORITY_BOOST: u16 = 10;

/// Hard delivery window. Early arrival waits at the stop; arrival after
/// `end` is a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest service start (ms since epoch).
    pub start: Timestamp,
    /// Latest acceptable arrival (ms since epoch).
    pub end: Timestamp,
}

impl TimeWindow {
    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, at: Timestamp) -> bool {
        at >= self.start && at <= self.end
    }
}

/// One pharmacy delivery stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    /// Pharmacy identifier.
    pub id: InlineString,
    /// Delivery location.
    pub position: Position,
    /// Hard delivery window.
    pub window: TimeWindow,
    /// Priority 1-10, higher is more critical.
    pub priority: u8,
    /// Load units consumed by this delivery.
    pub demand: u32,
    /// On-site service time (ms).
    pub service_time_ms: u64,
    /// Flagged by an external emergency signal; boosts seeding priority.
    pub emergency: bool,
}

impl Stop {
    /// Priority used for construction ordering, with the emergency boost
    /// applied.
    pub fn effective_priority(&self) -> u16 {
        if self.emergency {
            self.priority as u16 * EMERGENCY_PRIORITY_BOOST
        } else {
            self.priority as u16
        }
    }
}

/// A stop placed on a route with its planned timing.
#[derive(Debug, Clone, Copy)]
pub struct PlannedStop {
    /// The stop.
    pub stop: Stop,
    /// Planned arrival (after any wait for `window.start`).
    pub arrival: Timestamp,
    /// Planned departure (arrival + service time).
    pub departure: Timestamp,
}

/// An ordered, versioned delivery schedule for one vehicle.
#[derive(Debug, Clone)]
pub struct Route {
    /// Vehicle the route belongs to.
    pub vehicle: InlineString,
    /// Stops in visit order.
    pub stops: Vec<PlannedStop, MAX_STOPS>,
    /// Incremented by one on every re-plan.
    pub version: u32,
    /// Stops before this index are completed or in progress and must
    /// never be reordered.
    pub frozen_prefix: usize,
    /// Total driving distance.
    pub total_distance_km: f64,
    /// Total duration including service and waits.
    pub total_duration_ms: u64,
    /// Fuel estimate for the whole route.
    pub fuel_liters: f64,
}

impl Route {
    /// The unvisited suffix, eligible for re-planning.
    pub fn suffix(&self) -> &[PlannedStop] {
        &self.stops[self.frozen_prefix.min(self.stops.len())..]
    }

    /// The frozen prefix: completed plus in-progress legs.
    pub fn prefix(&self) -> &[PlannedStop] {
        &self.stops[..self.frozen_prefix.min(self.stops.len())]
    }
}

/// A delivery vehicle.
#[derive(Debug, Clone, Copy)]
pub struct Vehicle {
    /// Vehicle identifier.
    pub id: InlineString,
    /// Load capacity in the same units as stop demand.
    pub capacity: u32,
    /// Last known position.
    pub position: Position,
    /// Whether the cargo bay is refrigerated.
    pub refrigeration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    #[test]
    fn emergency_boost_dominates_plain_priority() {
        let plain = Stop {
            id: id("a"),
            position: Position { lat: 0.0, lon: 0.0 },
            window: TimeWindow { start: 0, end: 100 },
            priority: 10,
            demand: 1,
            service_time_ms: 0,
            emergency: false,
        };
        let boosted = Stop {
            priority: 2,
            emergency: true,
            ..plain
        };
        assert!(boosted.effective_priority() > plain.effective_priority());
    }

    #[test]
    fn window_containment() {
        let w = TimeWindow {
            start: 100,
            end: 200,
        };
        assert!(!w.contains(99));
        assert!(w.contains(100));
        assert!(w.contains(200));
        assert!(!w.contains(201));
    }
}
