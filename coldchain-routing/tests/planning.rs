//! End-to-end planning and re-planning scenarios.

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_routing::cost::CostModel;
use coldchain_routing::optimizer::Optimizer;
use coldchain_routing::tracker::{ApplyOutcome, DeliveryTracker};
use coldchain_routing::types::{Stop, TimeWindow, Vehicle};
use coldchain_routing::{replan, PlanStatus};

use proptest::prelude::*;

const HOUR: u64 = 3_600_000;

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

fn van() -> Vehicle {
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

/// Morning-window stop outranks a higher-priority afternoon stop:
/// window feasibility dominates priority.
#[test]
fn tight_morning_window_ordered_before_high_priority_afternoon() {
    // A: 14:00-18:00 as offsets from a 06:00 departure, priority 8
    let a = stop("pharm_a", 63.50, (8 * HOUR, 12 * HOUR), 8);
    // B: 09:00-10:00, priority 3
    let b = stop("pharm_b", 63.40, (3 * HOUR, 4 * HOUR), 3);

    let opt = Optimizer::new(CostModel::default());
    let result = opt.plan(&van(), &[a, b], 0);

    assert_eq!(result.status, PlanStatus::Optimal);
    assert_eq!(result.route.stops[0].stop.id, id("pharm_b"));
    assert_eq!(result.route.stops[1].stop.id, id("pharm_a"));
}

/// An escalated alert mid-route produces exactly one replan request; a
/// second trigger before the result lands coalesces into one pending.
#[test]
fn mid_route_escalation_coalesces_to_single_replan() {
    let mut tracker: DeliveryTracker<8> = DeliveryTracker::new(CostModel::default());
    tracker.register(van()).unwrap();

    let opt = Optimizer::new(CostModel::default());
    let route = opt
        .plan(
            &van(),
            &[
                stop("visited", 63.44, (0, 12 * HOUR), 5),
                stop("ahead_1", 63.46, (0, 12 * HOUR), 5),
                stop("ahead_2", 63.50, (0, 12 * HOUR), 5),
            ],
            0,
        )
        .route;
    tracker.assign_route(&id("van_07"), route, 0).unwrap();
    tracker.arrive(&id("van_07"), HOUR).unwrap();

    // First trigger: a request fires
    let req = tracker
        .on_alert_escalated(&id("van_07"), id("sensor_vax_01"))
        .unwrap()
        .expect("first trigger must start a request");

    // Second trigger before the planner answers: no second request
    assert!(tracker
        .on_alert_escalated(&id("van_07"), id("sensor_vax_01"))
        .unwrap()
        .is_none());

    // Planner answers; the coalesced request fires exactly once
    let current = tracker.route(&id("van_07")).unwrap().clone();
    let replanned = replan(&opt, &current, &van(), HOUR).route;
    let (outcome, _) = tracker
        .apply_result(&id("van_07"), req.generation, replanned, HOUR)
        .unwrap();
    assert!(matches!(outcome, ApplyOutcome::AppliedPendingNext(_)));
}

proptest! {
    /// Re-planning never reorders the frozen prefix, for any reachable
    /// split point.
    #[test]
    fn replan_preserves_frozen_prefix(
        lats in proptest::collection::vec(63.30f64..63.70, 2..10),
        split in 0usize..10,
    ) {
        let opt = Optimizer::new(CostModel::default());

        let mut stops = Vec::new();
        for (i, lat) in lats.iter().enumerate() {
            let mut name = String::from("p");
            name.push_str(&i.to_string());
            stops.push(stop(&name, *lat, (0, 24 * HOUR), 5));
        }

        let mut route = opt.plan(&van(), &stops, 0).route;
        route.frozen_prefix = split.min(route.stops.len());
        let prefix_before: Vec<_> =
            route.prefix().iter().map(|p| p.stop.id).collect();

        let result = replan(&opt, &route, &van(), 2 * HOUR);

        let prefix_after: Vec<_> =
            result.route.prefix().iter().map(|p| p.stop.id).collect();
        prop_assert_eq!(prefix_before, prefix_after);
        prop_assert_eq!(result.route.version, route.version + 1);
        // Every stop still appears exactly once
        prop_assert_eq!(result.route.stops.len(), route.stops.len());
    }
}
