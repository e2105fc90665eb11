//! Escalation State Machine
//!
//! Consumes threshold classifications and produces alert lifecycle
//! events. All timing flows through explicit `now` arguments and the
//! timer queue, so the machine is fully deterministic under test.
//!
//! Transition rules:
//! - entering Warning opens an alert and arms the warning hold
//! - entering Critical (directly or by hold expiry) arms the escalation
//!   timer, which fires even if the sensor goes silent
//! - a Normal reading starts the resolve hold; a violation during the
//!   hold reverts to the prior phase with its original deadline
//! - Escalated is terminal until resolution; for in-transit sensors it
//!   also emits a [`Event::ReplanNeeded`]
//!
//! The one-open-alert-per-sensor invariant is checked on every open. A
//! violated invariant is healed by merging into the existing alert and
//! reported as a [`SystemEventKind::InvariantHealed`] event.

use heapless::{FnvIndexMap, Vec};

use crate::constants::limits::{MAX_PENDING_TIMERS, MAX_STAGE_OUTPUT};
use crate::constants::time::DEFAULT_LIVENESS_INTERVAL_MS;
use crate::events::{AlertId, AlertStatus, Event, InlineString, Severity, SystemEventKind};
use crate::thresholds::ZoneThreshold;
use crate::time::Timestamp;

use super::timers::{TimerKind, TimerQueue};
use super::{Alert, Phase, PriorPhase};

/// Events produced by one engine call.
pub type EngineOutput = Vec<Event, MAX_STAGE_OUTPUT>;

/// Per-sensor runtime state cached between observations.
#[derive(Debug, Clone, Copy)]
struct SensorRuntime {
    phase: Phase,
    last_seen: Timestamp,
    last_temperature: f32,
    vehicle: Option<InlineString>,
    warning_hold_ms: u64,
    critical_hold_ms: u64,
}

/// The alert escalation engine for up to `N` sensors.
///
/// Drive it with [`observe`](Self::observe) for each classified reading
/// and [`tick`](Self::tick) on a regular cadence; `tick` fires due hold
/// timers and runs the liveness watchdog.
pub struct EscalationEngine<const N: usize> {
    states: FnvIndexMap<InlineString, SensorRuntime, N>,
    alerts: FnvIndexMap<InlineString, Alert, N>,
    timers: TimerQueue<MAX_PENDING_TIMERS>,
    next_alert_id: AlertId,
    liveness_ms: u64,
    invariant_violations: u32,
}

impl<const N: usize> EscalationEngine<N> {
    /// Create an engine with the default liveness interval.
    pub fn new() -> Self {
        Self::with_liveness(DEFAULT_LIVENESS_INTERVAL_MS)
    }

    /// Create an engine with an explicit liveness interval (ms of sensor
    /// silence tolerated while a violation is open).
    pub fn with_liveness(liveness_ms: u64) -> Self {
        Self {
            states: FnvIndexMap::new(),
            alerts: FnvIndexMap::new(),
            timers: TimerQueue::new(),
            next_alert_id: 1,
            liveness_ms,
            invariant_violations: 0,
        }
    }

    /// Process one classified reading.
    pub fn observe(
        &mut self,
        sensor_id: InlineString,
        severity: Severity,
        temperature: f32,
        threshold: &ZoneThreshold,
        vehicle: Option<InlineString>,
        now: Timestamp,
    ) -> EngineOutput {
        let mut out = EngineOutput::new();

        let mut rt = match self.states.get(&sensor_id) {
            Some(rt) => *rt,
            None => {
                let rt = SensorRuntime {
                    phase: Phase::Normal,
                    last_seen: now,
                    last_temperature: temperature,
                    vehicle,
                    warning_hold_ms: threshold.warning_hold_ms,
                    critical_hold_ms: threshold.critical_hold_ms,
                };
                if self.states.insert(sensor_id, rt).is_err() {
                    let _ = out.push(Event::System {
                        kind: SystemEventKind::StateTableFull,
                        timestamp: now,
                        details: self.states.len() as u32,
                    });
                    #[cfg(feature = "log")]
                    log::error!("sensor state table full, cannot track {}", sensor_id);
                    return out;
                }
                rt
            }
        };

        rt.last_seen = now;
        rt.last_temperature = temperature;
        rt.vehicle = vehicle;
        rt.warning_hold_ms = threshold.warning_hold_ms;
        rt.critical_hold_ms = threshold.critical_hold_ms;

        let bound = threshold.violated_bound(temperature);
        self.transition(&mut rt, sensor_id, severity, temperature, bound, now, &mut out);

        // Key is present, insert cannot fail
        let _ = self.states.insert(sensor_id, rt);
        out
    }

    /// Fire due timers and run the liveness watchdog.
    ///
    /// Stops early if the output fills; unfired timers stay due and fire
    /// on the next tick.
    pub fn tick(&mut self, now: Timestamp) -> EngineOutput {
        let mut out = EngineOutput::new();

        while out.len() + 2 <= out.capacity() {
            let Some(entry) = self.timers.pop_due(now) else {
                break;
            };
            let Some(mut rt) = self.states.get(&entry.sensor_id).copied() else {
                continue;
            };
            let Some(alert) = self.alerts.get(&entry.sensor_id).copied() else {
                continue;
            };
            // A timer for a superseded alert is stale, drop it
            if alert.id != entry.alert_id || !alert.is_open() {
                continue;
            }

            match entry.kind {
                TimerKind::WarningHold => {
                    if matches!(rt.phase, Phase::Warning { .. }) {
                        rt.phase = Phase::Critical { since: now };
                        let mut a = alert;
                        a.severity = Severity::Critical;
                        let _ = self.alerts.insert(entry.sensor_id, a);
                        let _ = out.push(Event::AlertEscalated {
                            alert_id: a.id,
                            sensor_id: entry.sensor_id,
                            status: AlertStatus::Critical,
                            temperature: a.last_temperature,
                            threshold: a.threshold,
                            timestamp: now,
                        });
                        self.timers.schedule(
                            entry.sensor_id,
                            a.id,
                            TimerKind::Escalate,
                            now + rt.critical_hold_ms,
                        );
                        let _ = self.states.insert(entry.sensor_id, rt);
                    }
                }
                TimerKind::Escalate => {
                    if matches!(rt.phase, Phase::Critical { .. }) {
                        rt.phase = Phase::Escalated { since: now };
                        let mut a = alert;
                        a.escalated_at = Some(now);
                        let _ = self.alerts.insert(entry.sensor_id, a);
                        let _ = out.push(Event::AlertEscalated {
                            alert_id: a.id,
                            sensor_id: entry.sensor_id,
                            status: AlertStatus::Escalated,
                            temperature: a.last_temperature,
                            threshold: a.threshold,
                            timestamp: now,
                        });
                        if let Some(vehicle) = rt.vehicle {
                            let _ = out.push(Event::ReplanNeeded {
                                vehicle,
                                sensor_id: entry.sensor_id,
                                alert_id: a.id,
                                timestamp: now,
                            });
                        }
                        let _ = self.states.insert(entry.sensor_id, rt);
                    }
                }
                TimerKind::ResolveHold => {
                    if matches!(rt.phase, Phase::Resolving { .. }) {
                        rt.phase = Phase::Normal;
                        self.timers.cancel_alert(&entry.sensor_id, alert.id);
                        self.alerts.remove(&entry.sensor_id);
                        let _ = out.push(Event::AlertResolved {
                            alert_id: alert.id,
                            sensor_id: entry.sensor_id,
                            temperature: rt.last_temperature,
                            timestamp: now,
                        });
                        let _ = self.states.insert(entry.sensor_id, rt);
                    }
                }
            }
        }

        self.liveness_sweep(now, &mut out);
        out
    }

    /// The open alert for a sensor, if any.
    pub fn open_alert(&self, sensor_id: &InlineString) -> Option<&Alert> {
        self.alerts.get(sensor_id).filter(|a| a.is_open())
    }

    /// Number of open alerts.
    pub fn open_alert_count(&self) -> usize {
        self.alerts.values().filter(|a| a.is_open()).count()
    }

    /// How many invariant self-heals have occurred.
    pub fn invariant_violations(&self) -> u32 {
        self.invariant_violations
    }

    fn transition(
        &mut self,
        rt: &mut SensorRuntime,
        sensor_id: InlineString,
        severity: Severity,
        temperature: f32,
        bound: f32,
        now: Timestamp,
        out: &mut EngineOutput,
    ) {
        loop {
            match (rt.phase, severity) {
                (Phase::Normal, Severity::Normal) => {}

                (Phase::Normal, Severity::Warning) => {
                    let id =
                        self.raise_alert(sensor_id, Severity::Warning, temperature, bound, now, out);
                    self.timers.schedule(
                        sensor_id,
                        id,
                        TimerKind::WarningHold,
                        now + rt.warning_hold_ms,
                    );
                    rt.phase = Phase::Warning { since: now };
                }

                // A reading can jump straight past the warning band
                (Phase::Normal, Severity::Critical) => {
                    let id = self.raise_alert(
                        sensor_id,
                        Severity::Critical,
                        temperature,
                        bound,
                        now,
                        out,
                    );
                    self.timers.schedule(
                        sensor_id,
                        id,
                        TimerKind::Escalate,
                        now + rt.critical_hold_ms,
                    );
                    rt.phase = Phase::Critical { since: now };
                }

                (Phase::Warning { .. }, Severity::Warning)
                | (Phase::Critical { .. }, Severity::Warning)
                | (Phase::Critical { .. }, Severity::Critical)
                | (Phase::Escalated { .. }, Severity::Warning)
                | (Phase::Escalated { .. }, Severity::Critical) => {
                    // Severity never downgrades while an alert is open;
                    // refresh the evidence and keep waiting on timers
                    self.touch_alert(&sensor_id, temperature, now);
                }

                (Phase::Warning { .. }, Severity::Critical) => {
                    if let Some(mut a) = self.alerts.get(&sensor_id).copied() {
                        a.severity = Severity::Critical;
                        a.last_seen = now;
                        a.last_temperature = temperature;
                        a.threshold = bound;
                        let _ = self.alerts.insert(sensor_id, a);
                        let _ = out.push(Event::AlertEscalated {
                            alert_id: a.id,
                            sensor_id,
                            status: AlertStatus::Critical,
                            temperature,
                            threshold: bound,
                            timestamp: now,
                        });
                        self.timers.cancel(&sensor_id, a.id, TimerKind::WarningHold);
                        self.timers.schedule(
                            sensor_id,
                            a.id,
                            TimerKind::Escalate,
                            now + rt.critical_hold_ms,
                        );
                    }
                    rt.phase = Phase::Critical { since: now };
                }

                (Phase::Warning { since }, Severity::Normal) => {
                    if let Some(id) = self.open_alert(&sensor_id).map(|a| a.id) {
                        self.timers.cancel(&sensor_id, id, TimerKind::WarningHold);
                        self.timers.schedule(
                            sensor_id,
                            id,
                            TimerKind::ResolveHold,
                            now + rt.warning_hold_ms,
                        );
                        rt.phase = Phase::Resolving {
                            prior: PriorPhase::Warning { since },
                            normal_since: now,
                        };
                    } else {
                        rt.phase = Phase::Normal;
                    }
                }

                (Phase::Critical { since }, Severity::Normal) => {
                    if let Some(id) = self.open_alert(&sensor_id).map(|a| a.id) {
                        self.timers.cancel(&sensor_id, id, TimerKind::Escalate);
                        self.timers.schedule(
                            sensor_id,
                            id,
                            TimerKind::ResolveHold,
                            now + rt.warning_hold_ms,
                        );
                        rt.phase = Phase::Resolving {
                            prior: PriorPhase::Critical { since },
                            normal_since: now,
                        };
                    } else {
                        rt.phase = Phase::Normal;
                    }
                }

                (Phase::Escalated { since }, Severity::Normal) => {
                    if let Some(id) = self.open_alert(&sensor_id).map(|a| a.id) {
                        self.timers.schedule(
                            sensor_id,
                            id,
                            TimerKind::ResolveHold,
                            now + rt.warning_hold_ms,
                        );
                        rt.phase = Phase::Resolving {
                            prior: PriorPhase::Escalated { since },
                            normal_since: now,
                        };
                    } else {
                        rt.phase = Phase::Normal;
                    }
                }

                (Phase::Resolving { .. }, Severity::Normal) => {
                    // Resolve hold keeps running
                    self.touch_alert(&sensor_id, temperature, now);
                }

                // Reversion: the violation came back before the hold
                // elapsed. Restore the prior phase with its original
                // deadline, then re-run the transition for this reading.
                (Phase::Resolving { prior, .. }, _) => {
                    if let Some(id) = self.open_alert(&sensor_id).map(|a| a.id) {
                        self.timers.cancel(&sensor_id, id, TimerKind::ResolveHold);
                        match prior {
                            PriorPhase::Warning { since } => {
                                self.timers.schedule(
                                    sensor_id,
                                    id,
                                    TimerKind::WarningHold,
                                    since + rt.warning_hold_ms,
                                );
                                rt.phase = Phase::Warning { since };
                            }
                            PriorPhase::Critical { since } => {
                                self.timers.schedule(
                                    sensor_id,
                                    id,
                                    TimerKind::Escalate,
                                    since + rt.critical_hold_ms,
                                );
                                rt.phase = Phase::Critical { since };
                            }
                            PriorPhase::Escalated { since } => {
                                rt.phase = Phase::Escalated { since };
                            }
                        }
                        continue;
                    }
                    rt.phase = Phase::Normal;
                    continue;
                }
            }
            break;
        }
    }

    /// Open a new alert, or merge into an unexpectedly open one.
    fn raise_alert(
        &mut self,
        sensor_id: InlineString,
        severity: Severity,
        temperature: f32,
        bound: f32,
        now: Timestamp,
        out: &mut EngineOutput,
    ) -> AlertId {
        if let Some(existing) = self.alerts.get(&sensor_id).copied() {
            if existing.is_open() {
                // Phase said no alert but one is open. Merge rather than
                // double-open, and surface the heal for monitoring.
                self.invariant_violations += 1;
                let _ = out.push(Event::System {
                    kind: SystemEventKind::InvariantHealed,
                    timestamp: now,
                    details: existing.id,
                });
                #[cfg(feature = "log")]
                log::warn!(
                    "merging into open alert {} for {} found outside an alerting phase",
                    existing.id,
                    sensor_id
                );
                let mut merged = existing;
                merged.severity = severity;
                merged.last_seen = now;
                merged.last_temperature = temperature;
                merged.threshold = bound;
                let _ = self.alerts.insert(sensor_id, merged);
                return merged.id;
            }
        }

        let id = self.next_alert_id;
        self.next_alert_id = self.next_alert_id.wrapping_add(1);

        let alert = Alert {
            id,
            sensor_id,
            opened_at: now,
            severity,
            escalated_at: None,
            resolved_at: None,
            last_seen: now,
            last_temperature: temperature,
            threshold: bound,
        };
        if self.alerts.insert(sensor_id, alert).is_err() {
            let _ = out.push(Event::System {
                kind: SystemEventKind::StateTableFull,
                timestamp: now,
                details: self.alerts.len() as u32,
            });
        }

        let status = if severity == Severity::Critical {
            AlertStatus::Critical
        } else {
            AlertStatus::Warning
        };
        let _ = out.push(Event::AlertRaised {
            alert_id: id,
            sensor_id,
            status,
            temperature,
            threshold: bound,
            timestamp: now,
        });
        id
    }

    fn touch_alert(&mut self, sensor_id: &InlineString, temperature: f32, now: Timestamp) {
        if let Some(a) = self.alerts.get_mut(sensor_id) {
            a.last_seen = now;
            a.last_temperature = temperature;
        }
    }

    /// Promote silent warning sensors to critical. A sensor that stops
    /// reporting mid-violation must not stall its alert in Warning;
    /// Critical and Escalated already progress on timers alone.
    fn liveness_sweep(&mut self, now: Timestamp, out: &mut EngineOutput) {
        let mut silent: Vec<InlineString, N> = Vec::new();
        for (id, rt) in self.states.iter() {
            if matches!(rt.phase, Phase::Warning { .. })
                && now.saturating_sub(rt.last_seen) >= self.liveness_ms
            {
                let _ = silent.push(*id);
            }
        }

        for sensor_id in silent {
            if out.len() + 1 > out.capacity() {
                break;
            }
            let Some(mut rt) = self.states.get(&sensor_id).copied() else {
                continue;
            };
            let Some(mut a) = self.alerts.get(&sensor_id).copied() else {
                continue;
            };
            #[cfg(feature = "log")]
            log::warn!(
                "sensor {} silent for {} ms during open warning, treating as critical",
                sensor_id,
                now.saturating_sub(rt.last_seen)
            );
            rt.phase = Phase::Critical { since: now };
            a.severity = Severity::Critical;
            let _ = out.push(Event::AlertEscalated {
                alert_id: a.id,
                sensor_id,
                status: AlertStatus::Critical,
                temperature: a.last_temperature,
                threshold: a.threshold,
                timestamp: now,
            });
            self.timers.cancel(&sensor_id, a.id, TimerKind::WarningHold);
            self.timers
                .schedule(sensor_id, a.id, TimerKind::Escalate, now + rt.critical_hold_ms);
            let _ = self.alerts.insert(sensor_id, a);
            let _ = self.states.insert(sensor_id, rt);
        }
    }
}

impl<const N: usize> Default for EscalationEngine<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::{ThresholdTable, Zone};

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    fn vaccine_threshold() -> ZoneThreshold {
        // 2-8 °C band, 0/10 critical, short holds for the tests
        ThresholdTable::default()
            .get(Zone::Vaccines)
            .with_holds(60_000, 120_000)
    }

    fn observe<const N: usize>(
        engine: &mut EscalationEngine<N>,
        sensor: &str,
        temp: f32,
        now: Timestamp,
    ) -> EngineOutput {
        let t = vaccine_threshold();
        engine.observe(id(sensor), t.classify(temp), temp, &t, None, now)
    }

    #[test]
    fn warning_reading_opens_alert() {
        let mut engine = EscalationEngine::<16>::new();

        let out = observe(&mut engine, "s1", 9.2, 1_000);
        assert!(matches!(
            out[0],
            Event::AlertRaised {
                status: AlertStatus::Warning,
                ..
            }
        ));
        assert_eq!(engine.open_alert_count(), 1);

        // Repeated warnings refresh, never re-open
        let out = observe(&mut engine, "s1", 9.4, 2_000);
        assert!(out.is_empty());
        assert_eq!(engine.open_alert_count(), 1);
    }

    #[test]
    fn warning_hold_expiry_promotes_to_critical() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 9.2, 0);

        assert!(engine.tick(59_999).is_empty());

        let out = engine.tick(60_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Critical,
                ..
            }
        ));
    }

    #[test]
    fn direct_critical_opens_critical_alert() {
        let mut engine = EscalationEngine::<16>::new();

        let out = observe(&mut engine, "s1", 11.0, 1_000);
        assert!(matches!(
            out[0],
            Event::AlertRaised {
                status: AlertStatus::Critical,
                ..
            }
        ));
    }

    #[test]
    fn critical_hold_escalates_without_further_readings() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 11.0, 0);

        let out = engine.tick(120_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Escalated,
                ..
            }
        ));
    }

    #[test]
    fn escalated_in_transit_sensor_requests_replan() {
        let mut engine = EscalationEngine::<16>::new();
        let t = vaccine_threshold();
        engine.observe(
            id("s1"),
            Severity::Critical,
            11.0,
            &t,
            Some(id("van_07")),
            0,
        );

        let out = engine.tick(120_000);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[1],
            Event::ReplanNeeded { vehicle, .. } if vehicle == id("van_07")
        ));
    }

    #[test]
    fn resolve_hold_closes_alert() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 9.2, 0);
        observe(&mut engine, "s1", 5.0, 10_000);

        // Hold not yet elapsed
        assert!(engine.tick(69_999).is_empty());

        let out = engine.tick(70_000);
        assert!(matches!(out[0], Event::AlertResolved { .. }));
        assert_eq!(engine.open_alert_count(), 0);

        // A fresh violation opens a new alert with a new id
        let out = observe(&mut engine, "s1", 9.2, 80_000);
        assert!(matches!(out[0], Event::AlertRaised { alert_id: 2, .. }));
    }

    #[test]
    fn reversion_during_resolve_restores_prior_deadline() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 11.0, 0); // Critical, escalates at 120 s
        observe(&mut engine, "s1", 5.0, 30_000); // Resolving
        observe(&mut engine, "s1", 11.0, 40_000); // Reverts to Critical

        // Original escalation deadline still applies
        assert!(engine.tick(119_999).is_empty());
        let out = engine.tick(120_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Escalated,
                ..
            }
        ));
    }

    #[test]
    fn cancelled_timer_never_fires_after_resolution() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 11.0, 0);
        observe(&mut engine, "s1", 5.0, 10_000);

        let out = engine.tick(70_000);
        assert!(matches!(out[0], Event::AlertResolved { .. }));

        // The old escalation deadline passes with nothing open
        assert!(engine.tick(200_000).is_empty());
    }

    #[test]
    fn one_open_alert_per_sensor_across_severity_changes() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 9.2, 0);
        observe(&mut engine, "s1", 11.0, 1_000);
        observe(&mut engine, "s1", 9.5, 2_000);
        observe(&mut engine, "s1", 12.0, 3_000);

        assert_eq!(engine.open_alert_count(), 1);
        assert_eq!(engine.invariant_violations(), 0);
    }

    #[test]
    fn warning_to_critical_on_reading_emits_escalation() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 9.2, 0);

        let out = observe(&mut engine, "s1", 11.0, 5_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Critical,
                ..
            }
        ));

        // Escalation deadline runs from the critical transition
        assert!(engine.tick(124_999).is_empty());
        assert!(!engine.tick(125_000).is_empty());
    }

    #[test]
    fn silent_warning_sensor_promoted_by_watchdog() {
        let mut engine = EscalationEngine::<16>::with_liveness(30_000);
        let t = vaccine_threshold().with_holds(600_000, 120_000);
        engine.observe(id("s1"), Severity::Warning, 9.2, &t, None, 0);

        // Silence below the liveness interval is fine
        assert!(engine.tick(29_999).is_empty());

        let out = engine.tick(30_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Critical,
                ..
            }
        ));

        // Watchdog fires once; the sensor is now on the escalation timer
        assert!(engine.tick(31_000).is_empty());
        let out = engine.tick(150_000);
        assert!(matches!(
            out[0],
            Event::AlertEscalated {
                status: AlertStatus::Escalated,
                ..
            }
        ));
    }

    #[test]
    fn sensors_are_independent() {
        let mut engine = EscalationEngine::<16>::new();
        observe(&mut engine, "s1", 9.2, 0);
        observe(&mut engine, "s2", 5.0, 0);

        assert_eq!(engine.open_alert_count(), 1);
        assert!(engine.open_alert(&id("s2")).is_none());
        assert!(engine.open_alert(&id("s1")).is_some());
    }
}
