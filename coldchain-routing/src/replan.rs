//! Mid-Route Re-planning
//!
//! Re-planning only touches the unvisited suffix of a route. The frozen
//! prefix - completed legs plus the leg currently being driven - is an
//! index boundary the planner never crosses, so a driver is never told
//! to turn around mid-leg. Every re-plan increments the route version;
//! the tracker discards results whose version race was lost.
//!
//! Emergency stops are inserted at the cost-minimal feasible position
//! in the suffix. When no position is feasible the emergency goes
//! first anyway - that is the point of an emergency - and every stop
//! pushed outside its window by the shift is reported as a violation.

use heapless::Vec;

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_core::time::Timestamp;

use crate::optimizer::{Optimizer, PlanResult, PlanStatus, Violation};
use crate::types::{Route, Stop, Vehicle, MAX_STOPS};

/// Re-plan the unvisited suffix of `route` from the vehicle's current
/// position at `now`. The frozen prefix is carried over unchanged.
pub fn replan(
    optimizer: &Optimizer,
    route: &Route,
    vehicle: &Vehicle,
    now: Timestamp,
) -> PlanResult {
    let suffix: Vec<Stop, MAX_STOPS> = route.suffix().iter().map(|p| p.stop).collect();

    let mut result = optimizer.plan(vehicle, &suffix, now);
    rebuild(&mut result, route);
    result
}

/// Insert an emergency stop into the suffix of `route`.
///
/// Tries every suffix position and keeps the cheapest feasible one; if
/// none is feasible the emergency is placed first and the re-windowed
/// suffix's violations are reported. A route already at capacity sheds
/// its lowest-priority suffix stop to make room; the shed stop is named
/// in `omitted`, never silently lost.
pub fn insert_emergency(
    optimizer: &Optimizer,
    route: &Route,
    emergency: Stop,
    vehicle: &Vehicle,
    now: Timestamp,
) -> PlanResult {
    let mut flagged = emergency;
    flagged.emergency = true;

    let mut suffix: Vec<Stop, MAX_STOPS> = route.suffix().iter().map(|p| p.stop).collect();
    let prefix_len = route.prefix().len();

    let mut omitted: Vec<InlineString, MAX_STOPS> = Vec::new();
    while prefix_len + suffix.len() + 1 > MAX_STOPS && !suffix.is_empty() {
        // The emergency boost makes flagged stops shed last
        let shed = suffix
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| (s.effective_priority(), s.id))
            .map(|(i, _)| i);
        let Some(idx) = shed else { break };
        let dropped = suffix.remove(idx);
        let _ = omitted.push(dropped.id);
    }

    let mut best: Option<(usize, f64)> = None;
    for pos in 0..=suffix.len() {
        let candidate = with_inserted(&suffix, pos, flagged);
        let eval = optimizer.evaluate(vehicle.position, now, &candidate);
        if eval.violations.is_empty() && best.map_or(true, |(_, c)| eval.cost < c) {
            best = Some((pos, eval.cost));
        }
    }

    // Infeasible everywhere: the emergency preempts the suffix
    let position = best.map(|(p, _)| p).unwrap_or(0);
    let sequence = with_inserted(&suffix, position, flagged);
    let eval = optimizer.evaluate(vehicle.position, now, &sequence);

    let status = if let Some(first) = omitted.first() {
        PlanStatus::Infeasible { stop: *first }
    } else if let Some(v) = eval.violations.first() {
        PlanStatus::Infeasible { stop: v.stop }
    } else {
        PlanStatus::Optimal
    };

    let violations: Vec<Violation, MAX_STOPS> = eval.violations.clone();
    let mut result = PlanResult {
        route: Route {
            vehicle: vehicle.id,
            stops: eval.planned,
            version: 1,
            frozen_prefix: 0,
            total_distance_km: eval.total_distance_km,
            total_duration_ms: eval.total_duration_ms,
            fuel_liters: optimizer.cost_model().fuel_liters(eval.total_distance_km),
        },
        status,
        violations,
        omitted,
    };
    rebuild(&mut result, route);
    result
}

/// Prepend the frozen prefix and stamp the next version.
///
/// A suffix stop that no longer fits is named in `omitted` and flips
/// the status to infeasible; the caller sheds ahead of time, so this
/// only fires if a plan arrives over-long.
fn rebuild(result: &mut PlanResult, original: &Route) {
    let mut stops: Vec<_, MAX_STOPS> = Vec::new();
    for p in original.prefix() {
        let _ = stops.push(*p);
    }
    for p in &result.route.stops {
        if stops.push(*p).is_err() {
            let _ = result.omitted.push(p.stop.id);
            result.status = PlanStatus::Infeasible { stop: p.stop.id };
        }
    }

    result.route.stops = stops;
    result.route.vehicle = original.vehicle;
    result.route.version = original.version + 1;
    result.route.frozen_prefix = original.frozen_prefix;
}

fn with_inserted(suffix: &[Stop], position: usize, stop: Stop) -> Vec<Stop, MAX_STOPS> {
    let mut out: Vec<Stop, MAX_STOPS> = Vec::new();
    for (i, s) in suffix.iter().enumerate() {
        if i == position {
            let _ = out.push(stop);
        }
        let _ = out.push(*s);
    }
    if position >= suffix.len() {
        let _ = out.push(stop);
    }
    out
}
