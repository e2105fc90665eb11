//! Integration tests for the sensor-to-alert pipeline.
//!
//! Drives the full Validation → Threshold → Escalation chain with a
//! fixed test clock and checks the alert lifecycle guarantees end to
//! end.

use coldchain_core::alert::EscalationEngine;
use coldchain_core::events::{AlertStatus, Event, InlineString, Severity};
use coldchain_core::pipeline::{
    EscalationStage, Pipeline, ThresholdStage, ValidationStage,
};
use coldchain_core::reading::RawReading;
use coldchain_core::registry::{SensorInfo, SensorLocation, SensorRegistry, SensorStatus};
use coldchain_core::thresholds::{ThresholdTable, Zone, ZoneThreshold};
use coldchain_core::time::{FixedTime, TimeSource};

use proptest::prelude::*;

const MIN: u64 = 60_000;

fn id(s: &str) -> InlineString {
    InlineString::new(s).unwrap()
}

fn registry(entries: &[(&str, SensorLocation)]) -> SensorRegistry {
    let mut reg = SensorRegistry::new();
    for (sensor, location) in entries {
        reg.register(SensorInfo {
            id: id(sensor),
            location: *location,
            zone: Zone::Vaccines,
            calibrated_at: 0,
            status: SensorStatus::Active,
        })
        .unwrap();
    }
    reg
}

fn reading(sensor: &str, temp: f32, ts: u64) -> Event {
    Event::ReadingReceived {
        reading: RawReading {
            sensor_id: id(sensor),
            temperature: temp,
            humidity: 45.0,
            battery_level: 88.0,
            position: None,
            timestamp: ts,
        },
    }
}

/// Vaccine scenario from the field calibration: band 2-8 °C, warning
/// hold 900 s, critical hold 120 s. A 9.2 °C reading, then another 16
/// minutes later, must produce exactly Warning then Critical - two
/// notification events, no more.
#[test]
fn nine_point_two_scenario_warning_then_critical() {
    let table = ThresholdTable::default().with_zone(
        Zone::Vaccines,
        ZoneThreshold::new(2.0, 8.0, 0.0, 10.0).with_holds(900_000, 120_000),
    );

    let mut escalation = EscalationStage::new();
    escalation.set_table(table);
    let mut pipeline: Pipeline<32> = Pipeline::builder()
        .add_stage(ValidationStage::new(registry(&[(
            "fridge_vax_01",
            SensorLocation::Site(id("pharmacy_3")),
        )])))
        .add_stage(ThresholdStage::with_table(table))
        .add_stage(escalation)
        .build();

    let mut clock = FixedTime::new(0);

    pipeline.push_event(reading("fridge_vax_01", 9.2, clock.now()));
    pipeline.process_batch(10, clock.now()).unwrap();

    clock.advance(16 * MIN);
    pipeline.tick(clock.now());
    pipeline.push_event(reading("fridge_vax_01", 9.2, clock.now()));
    pipeline.process_batch(10, clock.now()).unwrap();

    let mut statuses = Vec::new();
    while let Some(e) = pipeline.pop_result() {
        match e {
            Event::AlertRaised { status, .. } | Event::AlertEscalated { status, .. } => {
                statuses.push(status)
            }
            Event::AlertResolved { .. } => panic!("nothing should resolve here"),
            _ => {}
        }
    }
    assert_eq!(statuses, vec![AlertStatus::Warning, AlertStatus::Critical]);
}

/// Silence while Critical still escalates: the hold timer fires with no
/// further readings.
#[test]
fn silent_critical_sensor_escalates_on_timer_alone() {
    let mut pipeline: Pipeline<32> = Pipeline::builder()
        .add_stage(ValidationStage::new(registry(&[(
            "reefer_vax_02",
            SensorLocation::Vehicle(id("van_07")),
        )])))
        .add_stage(ThresholdStage::new())
        .add_stage(EscalationStage::new())
        .build();

    let mut clock = FixedTime::new(0);

    // 11 °C is past the vaccine critical max
    pipeline.push_event(reading("reefer_vax_02", 11.0, clock.now()));
    pipeline.process_batch(10, clock.now()).unwrap();
    assert!(matches!(
        pipeline.pop_result(),
        Some(Event::AlertRaised {
            status: AlertStatus::Critical,
            ..
        })
    ));

    // No readings at all; default critical hold is 15 minutes
    clock.advance(15 * MIN);
    pipeline.tick(clock.now());

    let escalated = pipeline.pop_result().unwrap();
    assert!(matches!(
        escalated,
        Event::AlertEscalated {
            status: AlertStatus::Escalated,
            ..
        }
    ));

    // In-transit sensor: the escalation also requests a re-plan
    let replan = pipeline.pop_result().unwrap();
    assert!(
        matches!(replan, Event::ReplanNeeded { vehicle, .. } if vehicle == id("van_07"))
    );
}

/// Duplicate deliveries of one reading cause at most one transition.
#[test]
fn duplicate_reading_is_idempotent() {
    let mut pipeline: Pipeline<32> = Pipeline::builder()
        .add_stage(ValidationStage::new(registry(&[(
            "fridge_vax_01",
            SensorLocation::Site(id("pharmacy_3")),
        )])))
        .add_stage(ThresholdStage::new())
        .add_stage(EscalationStage::new())
        .build();

    for _ in 0..5 {
        pipeline.push_event(reading("fridge_vax_01", 9.2, 1_000));
    }
    pipeline.process_batch(10, 2_000).unwrap();

    let mut raised = 0;
    while let Some(e) = pipeline.pop_result() {
        if matches!(e, Event::AlertRaised { .. }) {
            raised += 1;
        }
    }
    assert_eq!(raised, 1);
}

proptest! {
    /// At most one open alert per sensor under arbitrary temperature
    /// sequences, with ticks interleaved.
    #[test]
    fn at_most_one_open_alert_per_sensor(
        temps in proptest::collection::vec(-30.0f32..30.0, 1..60),
    ) {
        let table = ThresholdTable::default();
        let threshold = table.get(Zone::Vaccines);
        let mut engine = EscalationEngine::<16>::new();

        let mut now = 0u64;
        for temp in temps {
            now += 30_000;
            let severity = threshold.classify(temp);
            engine.observe(id("s1"), severity, temp, &threshold, None, now);
            if now % 90_000 == 0 {
                engine.tick(now);
            }
            prop_assert!(engine.open_alert_count() <= 1);
            prop_assert_eq!(engine.invariant_violations(), 0);
        }
    }

    /// Classification stays pure under interleaved engine activity.
    #[test]
    fn classification_unaffected_by_engine_state(temp in -60.0f32..60.0) {
        let threshold = ThresholdTable::default().get(Zone::Vaccines);
        let before = threshold.classify(temp);

        let mut engine = EscalationEngine::<16>::new();
        engine.observe(id("s1"), Severity::Critical, 11.0, &threshold, None, 0);
        engine.tick(1_000_000);

        prop_assert_eq!(threshold.classify(temp), before);
    }
}
