//! Route Construction and Local Search
//!
//! Two phases, both deterministic:
//!
//! 1. **Construction**: stops are seeded in descending effective
//!    priority (ties broken by earlier window start, then id) and each
//!    is inserted at its cheapest feasible position. A stop with no
//!    feasible position is still placed - at its cheapest position -
//!    and reported as a violation; a stop that cannot fit the vehicle's
//!    capacity is omitted and named in the result.
//! 2. **Improvement**: pairwise exchange over the sequence, accepting
//!    only strictly-improving moves that do not add violations, until a
//!    local optimum or the move budget. Budget exhaustion returns the
//!    best route so far flagged [`PlanStatus::BudgetExceeded`].

use core::cmp::Reverse;

use heapless::Vec;

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_core::time::Timestamp;

use crate::cost::CostModel;
use crate::geo::haversine_km;
use crate::types::{PlannedStop, Route, Stop, Vehicle, MAX_STOPS};

/// Default local search move budget.
pub const DEFAULT_MOVE_BUDGET: u32 = 256;

/// Bound on local search effort.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    /// Maximum candidate moves evaluated during improvement.
    pub max_moves: u32,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_moves: DEFAULT_MOVE_BUDGET,
        }
    }
}

/// How the plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// Local optimum reached, every stop scheduled inside its window.
    Optimal,
    /// Move budget exhausted before a local optimum; route is valid but
    /// possibly improvable.
    BudgetExceeded,
    /// At least one stop could not be feasibly scheduled.
    Infeasible {
        /// The first offending stop.
        stop: InlineString,
    },
}

/// A stop scheduled outside its delivery window.
#[derive(Debug, Clone, Copy)]
pub struct Violation {
    /// The late stop.
    pub stop: InlineString,
    /// Planned arrival.
    pub arrival: Timestamp,
    /// The window edge it misses.
    pub window_end: Timestamp,
}

/// Outcome of a planning run. The route is always usable; check
/// `status` and `violations` before promising the windows.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// The planned route.
    pub route: Route,
    /// How the plan ended.
    pub status: PlanStatus,
    /// Stops scheduled outside their windows.
    pub violations: Vec<Violation, MAX_STOPS>,
    /// Stops omitted because they exceed vehicle capacity.
    pub omitted: Vec<InlineString, MAX_STOPS>,
}

/// Evaluation of one candidate sequence.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Planned timing per stop.
    pub planned: Vec<PlannedStop, MAX_STOPS>,
    /// Driving distance.
    pub total_distance_km: f64,
    /// Duration from departure to final service end.
    pub total_duration_ms: u64,
    /// Objective: weighted distance plus lateness penalties.
    pub cost: f64,
    /// Window violations in this sequence.
    pub violations: Vec<Violation, MAX_STOPS>,
}

/// Deterministic route planner.
pub struct Optimizer {
    cost: CostModel,
    budget: SearchBudget,
}

impl Optimizer {
    /// Planner with the default move budget.
    pub fn new(cost: CostModel) -> Self {
        Self {
            cost,
            budget: SearchBudget::default(),
        }
    }

    /// Planner with an explicit budget.
    pub fn with_budget(cost: CostModel, budget: SearchBudget) -> Self {
        Self { cost, budget }
    }

    /// The cost model in use.
    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Plan a route visiting every stop exactly once, departing from the
    /// vehicle's position at `depart_at`.
    pub fn plan(&self, vehicle: &Vehicle, stops: &[Stop], depart_at: Timestamp) -> PlanResult {
        let mut omitted: Vec<InlineString, MAX_STOPS> = Vec::new();
        let mut sequence: Vec<Stop, MAX_STOPS> = Vec::new();
        let mut load: u32 = 0;

        for &idx in self.seed_order(stops).iter() {
            let stop = stops[idx];

            if load + stop.demand > vehicle.capacity || sequence.is_full() {
                let _ = omitted.push(stop.id);
                continue;
            }
            load += stop.demand;

            self.insert_cheapest(&mut sequence, stop, vehicle.position, depart_at);
        }

        let (sequence, budget_exceeded) =
            self.improve(sequence, vehicle.position, depart_at);

        let eval = self.evaluate(vehicle.position, depart_at, &sequence);
        let status = if let Some(first) = omitted.first() {
            PlanStatus::Infeasible { stop: *first }
        } else if let Some(v) = eval.violations.first() {
            PlanStatus::Infeasible { stop: v.stop }
        } else if budget_exceeded {
            PlanStatus::BudgetExceeded
        } else {
            PlanStatus::Optimal
        };

        PlanResult {
            route: Route {
                vehicle: vehicle.id,
                stops: eval.planned.clone(),
                version: 1,
                frozen_prefix: 0,
                total_distance_km: eval.total_distance_km,
                total_duration_ms: eval.total_duration_ms,
                fuel_liters: self.cost.fuel_liters(eval.total_distance_km),
            },
            status,
            violations: eval.violations,
            omitted,
        }
    }

    /// Simulate a sequence from `start` at `depart_at`: arrivals, waits,
    /// violations, and the objective value.
    pub fn evaluate(&self, start: Position, depart_at: Timestamp, stops: &[Stop]) -> Evaluation {
        let mut planned: Vec<PlannedStop, MAX_STOPS> = Vec::new();
        let mut violations: Vec<Violation, MAX_STOPS> = Vec::new();

        let mut pos = start;
        let mut t = depart_at;
        let mut distance = 0.0;
        let mut cost = 0.0;

        for stop in stops {
            distance += haversine_km(pos, stop.position);
            cost += self.cost.leg_cost(pos, stop.position);
            t += self.cost.travel_time_ms(pos, stop.position);

            // Early arrival waits for the window to open
            let arrival = t.max(stop.window.start);
            if arrival > stop.window.end {
                let _ = violations.push(Violation {
                    stop: stop.id,
                    arrival,
                    window_end: stop.window.end,
                });
                cost += self.cost.lateness_penalty(stop, arrival);
            }

            let departure = arrival + stop.service_time_ms;
            let _ = planned.push(PlannedStop {
                stop: *stop,
                arrival,
                departure,
            });

            t = departure;
            pos = stop.position;
        }

        Evaluation {
            planned,
            total_distance_km: distance,
            total_duration_ms: t - depart_at,
            cost,
            violations,
        }
    }

    /// Descending effective priority; ties by window start, then id.
    fn seed_order(&self, stops: &[Stop]) -> Vec<usize, MAX_STOPS> {
        let mut order: Vec<usize, MAX_STOPS> = Vec::new();
        for i in 0..stops.len().min(MAX_STOPS) {
            let _ = order.push(i);
        }
        order.sort_unstable_by_key(|&i| {
            (
                Reverse(stops[i].effective_priority()),
                stops[i].window.start,
                stops[i].id,
            )
        });
        order
    }

    /// Insert `stop` at its cheapest feasible position, falling back to
    /// the cheapest position overall when none is feasible.
    fn insert_cheapest(
        &self,
        sequence: &mut Vec<Stop, MAX_STOPS>,
        stop: Stop,
        start: Position,
        depart_at: Timestamp,
    ) {
        let mut best_feasible: Option<(usize, f64)> = None;
        let mut best_any: Option<(usize, f64)> = None;

        for pos in 0..=sequence.len() {
            let mut candidate = sequence.clone();
            // Same capacity, cannot overflow after the is_full check
            if candidate.insert(pos, stop).is_err() {
                return;
            }
            let eval = self.evaluate(start, depart_at, &candidate);

            if best_any.map_or(true, |(_, c)| eval.cost < c) {
                best_any = Some((pos, eval.cost));
            }
            if eval.violations.is_empty() && best_feasible.map_or(true, |(_, c)| eval.cost < c) {
                best_feasible = Some((pos, eval.cost));
            }
        }

        if let Some((pos, _)) = best_feasible.or(best_any) {
            let _ = sequence.insert(pos, stop);
        }
    }

    /// Pairwise exchange until local optimum or budget. Returns the
    /// improved sequence and whether the budget ran out.
    fn improve(
        &self,
        mut sequence: Vec<Stop, MAX_STOPS>,
        start: Position,
        depart_at: Timestamp,
    ) -> (Vec<Stop, MAX_STOPS>, bool) {
        if sequence.len() < 2 {
            return (sequence, false);
        }

        let mut current = self.evaluate(start, depart_at, &sequence);
        let mut moves = 0u32;

        loop {
            let mut improved = false;

            'sweep: for i in 0..sequence.len() {
                for j in (i + 1)..sequence.len() {
                    if moves >= self.budget.max_moves {
                        return (sequence, true);
                    }
                    moves += 1;

                    sequence.swap(i, j);
                    let candidate = self.evaluate(start, depart_at, &sequence);

                    let acceptable = candidate.cost < current.cost
                        && candidate.violations.len() <= current.violations.len();
                    if acceptable {
                        current = candidate;
                        improved = true;
                        break 'sweep;
                    }
                    sequence.swap(i, j);
                }
            }

            if !improved {
                return (sequence, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::Weather;
    use crate::types::TimeWindow;

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    fn stop(name: &str, lat: f64, window: (u64, u64), priority: u8) -> Stop {
        Stop {
            id: id(name),
            position: Position { lat, lon: 10.4 },
            window: TimeWindow {
                start: window.0,
                end: window.1,
            },
            priority,
            demand: 10,
            service_time_ms: 10 * 60_000,
            emergency: false,
        }
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            id: id("van_07"),
            capacity: 1_000,
            position: Position {
                lat: 63.43,
                lon: 10.4,
            },
            refrigeration: true,
        }
    }

    const HOUR: u64 = 3_600_000;

    #[test]
    fn window_feasibility_dominates_priority() {
        // A has high priority but an afternoon window; B has a tight
        // morning window. B must come first.
        let a = stop("pharm_a", 63.50, (5 * HOUR, 9 * HOUR), 8);
        let b = stop("pharm_b", 63.40, (0, HOUR), 3);

        let opt = Optimizer::new(CostModel::new(Weather::clear()));
        let result = opt.plan(&vehicle(), &[a, b], 0);

        assert_eq!(result.status, PlanStatus::Optimal);
        assert_eq!(result.route.stops[0].stop.id, id("pharm_b"));
        assert_eq!(result.route.stops[1].stop.id, id("pharm_a"));
    }

    #[test]
    fn visits_every_stop_exactly_once() {
        let stops = [
            stop("p1", 63.40, (0, 10 * HOUR), 5),
            stop("p2", 63.45, (0, 10 * HOUR), 5),
            stop("p3", 63.50, (0, 10 * HOUR), 5),
        ];

        let opt = Optimizer::new(CostModel::default());
        let result = opt.plan(&vehicle(), &stops, 0);

        assert_eq!(result.route.stops.len(), 3);
        for s in &stops {
            assert_eq!(
                result
                    .route
                    .stops
                    .iter()
                    .filter(|p| p.stop.id == s.id)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn early_arrival_waits_for_window_open() {
        let s = stop("p1", 63.44, (2 * HOUR, 4 * HOUR), 5);

        let opt = Optimizer::new(CostModel::default());
        let result = opt.plan(&vehicle(), &[s], 0);

        assert_eq!(result.route.stops[0].arrival, 2 * HOUR);
        assert_eq!(result.status, PlanStatus::Optimal);
    }

    #[test]
    fn late_stop_reported_never_dropped() {
        // Window already closed before departure
        let s = stop("p1", 63.44, (0, 1_000), 5);

        let opt = Optimizer::new(CostModel::default());
        let result = opt.plan(&vehicle(), &[s], HOUR);

        assert_eq!(result.route.stops.len(), 1);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].stop, id("p1"));
        assert!(matches!(result.status, PlanStatus::Infeasible { .. }));
    }

    #[test]
    fn over_capacity_stop_is_omitted_and_named() {
        let mut big = stop("p_big", 63.44, (0, 10 * HOUR), 5);
        big.demand = 2_000;
        let ok = stop("p_ok", 63.45, (0, 10 * HOUR), 5);

        let opt = Optimizer::new(CostModel::default());
        let result = opt.plan(&vehicle(), &[big, ok], 0);

        assert_eq!(result.route.stops.len(), 1);
        assert_eq!(result.omitted[0], id("p_big"));
        assert_eq!(
            result.status,
            PlanStatus::Infeasible { stop: id("p_big") }
        );
    }

    #[test]
    fn deterministic_over_repeated_runs() {
        let stops = [
            stop("p1", 63.40, (0, 10 * HOUR), 5),
            stop("p2", 63.45, (0, 10 * HOUR), 5),
            stop("p3", 63.50, (0, 10 * HOUR), 7),
            stop("p4", 63.38, (0, 10 * HOUR), 2),
        ];

        let opt = Optimizer::new(CostModel::default());
        let first = opt.plan(&vehicle(), &stops, 0);
        let second = opt.plan(&vehicle(), &stops, 0);

        let ids_first: std::vec::Vec<_> =
            first.route.stops.iter().map(|p| p.stop.id).collect();
        let ids_second: std::vec::Vec<_> =
            second.route.stops.iter().map(|p| p.stop.id).collect();
        assert_eq!(ids_first, ids_second);
    }

    #[test]
    fn tiny_budget_flags_non_optimal() {
        let stops = [
            stop("p1", 63.40, (0, 10 * HOUR), 5),
            stop("p2", 63.55, (0, 10 * HOUR), 5),
            stop("p3", 63.45, (0, 10 * HOUR), 5),
            stop("p4", 63.60, (0, 10 * HOUR), 5),
        ];

        let opt = Optimizer::with_budget(CostModel::default(), SearchBudget { max_moves: 1 });
        let result = opt.plan(&vehicle(), &stops, 0);

        // Still returns a complete route
        assert_eq!(result.route.stops.len(), 4);
        assert!(matches!(
            result.status,
            PlanStatus::BudgetExceeded | PlanStatus::Optimal
        ));
    }

    #[test]
    fn fuel_estimate_matches_distance() {
        let stops = [stop("p1", 63.50, (0, 10 * HOUR), 5)];
        let opt = Optimizer::new(CostModel::default());
        let result = opt.plan(&vehicle(), &stops, 0);

        let expected = result.route.total_distance_km * 0.12;
        assert!((result.route.fuel_liters - expected).abs() < 1e-9);
    }
}
