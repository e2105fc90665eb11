//! Built-In Pipeline Stages
//!
//! Three domain stages plus a generic filter:
//! - [`ValidationStage`] gates raw readings against the registry
//! - [`ThresholdStage`] classifies accepted readings against zone bands
//! - [`EscalationStage`] runs the alert state machine
//! - [`FilterStage`] drops events failing a predicate
//!
//! Every stage passes through the event kinds it does not own, so the
//! standard chain also transports alert and system events emitted
//! upstream.

use crate::alert::EscalationEngine;
use crate::constants::limits::MAX_SENSORS;
use crate::events::{Event, InlineString};
use crate::reading::{Admission, GateConfig, ReadingGate};
use crate::registry::SensorRegistry;
use crate::stats::{StatsStore, StatsSummary};
use crate::thresholds::ThresholdTable;
use crate::time::Timestamp;

use super::{PipelineResult, PipelineStage, StageOutput};

/// Gates raw readings: consumes [`Event::ReadingReceived`], emits
/// [`Event::ReadingAccepted`] enriched with the sensor's zone and
/// vehicle, or [`Event::ReadingRejected`] with the reason code.
/// Duplicates and absorbed reorders emit nothing.
pub struct ValidationStage {
    gate: ReadingGate,
    registry: SensorRegistry,
}

impl ValidationStage {
    /// Create a stage over a sensor registry with default tolerances.
    pub fn new(registry: SensorRegistry) -> Self {
        Self {
            gate: ReadingGate::new(),
            registry,
        }
    }

    /// Create with explicit gate tolerances.
    pub fn with_config(registry: SensorRegistry, config: GateConfig) -> Self {
        Self {
            gate: ReadingGate::with_config(config),
            registry,
        }
    }

    /// The sensor registry, for runtime registration changes.
    pub fn registry_mut(&mut self) -> &mut SensorRegistry {
        &mut self.registry
    }
}

impl PipelineStage for ValidationStage {
    fn process(
        &mut self,
        event: Event,
        output: &mut StageOutput,
        now: Timestamp,
    ) -> PipelineResult<()> {
        let Event::ReadingReceived { reading } = event else {
            output.push(event);
            return Ok(());
        };

        match self.gate.admit(&reading, &self.registry, now) {
            Ok(Admission::Accepted) => {
                // admit() only accepts registered sensors
                if let Some(info) = self.registry.get(&reading.sensor_id) {
                    output.push(Event::ReadingAccepted {
                        sensor_id: reading.sensor_id,
                        zone: info.zone,
                        temperature: reading.temperature,
                        humidity: reading.humidity,
                        timestamp: reading.timestamp,
                        vehicle: info.location.vehicle(),
                    });
                }
            }
            Ok(Admission::Duplicate) | Ok(Admission::Absorbed) => {}
            Err(reason) => {
                output.push(Event::ReadingRejected {
                    sensor_id: reading.sensor_id,
                    reason,
                    timestamp: reading.timestamp,
                });
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "validation"
    }

    fn reset(&mut self) {
        self.gate = ReadingGate::new();
    }
}

/// Classifies accepted readings against the zone threshold table and
/// records them in the rolling statistics store. Consumes
/// [`Event::ReadingAccepted`], emits [`Event::Classified`].
pub struct ThresholdStage {
    table: ThresholdTable,
    stats: StatsStore,
}

impl ThresholdStage {
    /// Create with the default zone table.
    pub fn new() -> Self {
        Self::with_table(ThresholdTable::default())
    }

    /// Create with an explicit zone table.
    pub fn with_table(table: ThresholdTable) -> Self {
        Self {
            table,
            stats: StatsStore::new(),
        }
    }

    /// Swap the whole threshold table. Readings already classified keep
    /// their old classification.
    pub fn set_table(&mut self, table: ThresholdTable) {
        self.table = table;
    }

    /// The current table.
    pub fn table(&self) -> ThresholdTable {
        self.table
    }

    /// Rolling statistics for one sensor.
    pub fn stats(&self, sensor_id: &InlineString) -> Option<StatsSummary> {
        self.stats.summary(sensor_id)
    }

    /// The statistics store, for tracking queries.
    pub fn stats_store(&self) -> &StatsStore {
        &self.stats
    }
}

impl PipelineStage for ThresholdStage {
    fn process(
        &mut self,
        event: Event,
        output: &mut StageOutput,
        _now: Timestamp,
    ) -> PipelineResult<()> {
        let Event::ReadingAccepted {
            sensor_id,
            zone,
            temperature,
            timestamp,
            vehicle,
            ..
        } = event
        else {
            output.push(event);
            return Ok(());
        };

        let severity = self.table.get(zone).classify(temperature);
        self.stats.record(sensor_id, timestamp, temperature, severity);

        output.push(Event::Classified {
            sensor_id,
            zone,
            severity,
            temperature,
            timestamp,
            vehicle,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "threshold"
    }

    fn reset(&mut self) {
        self.stats = StatsStore::new();
    }
}

impl Default for ThresholdStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the alert escalation engine. Consumes [`Event::Classified`],
/// emits alert lifecycle events; its `tick` fires hold timers and the
/// liveness watchdog.
pub struct EscalationStage {
    engine: EscalationEngine<MAX_SENSORS>,
    table: ThresholdTable,
}

impl EscalationStage {
    /// Create with the default zone table and liveness interval.
    pub fn new() -> Self {
        Self::with_parts(EscalationEngine::new(), ThresholdTable::default())
    }

    /// Create from a configured engine and table.
    pub fn with_parts(engine: EscalationEngine<MAX_SENSORS>, table: ThresholdTable) -> Self {
        Self { engine, table }
    }

    /// The engine, for alert queries.
    pub fn engine(&self) -> &EscalationEngine<MAX_SENSORS> {
        &self.engine
    }

    /// Swap the zone table used for hold durations and bounds.
    pub fn set_table(&mut self, table: ThresholdTable) {
        self.table = table;
    }
}

impl PipelineStage for EscalationStage {
    fn process(
        &mut self,
        event: Event,
        output: &mut StageOutput,
        now: Timestamp,
    ) -> PipelineResult<()> {
        let Event::Classified {
            sensor_id,
            zone,
            severity,
            temperature,
            vehicle,
            ..
        } = event
        else {
            output.push(event);
            return Ok(());
        };

        let threshold = self.table.get(zone);
        for e in self
            .engine
            .observe(sensor_id, severity, temperature, &threshold, vehicle, now)
        {
            output.push(e);
        }
        Ok(())
    }

    fn tick(&mut self, now: Timestamp, output: &mut StageOutput) {
        for e in self.engine.tick(now) {
            output.push(e);
        }
    }

    fn name(&self) -> &'static str {
        "escalation"
    }
}

impl Default for EscalationStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops events failing a predicate.
pub struct FilterStage<F: Fn(&Event) -> bool + Send> {
    predicate: F,
}

impl<F: Fn(&Event) -> bool + Send> FilterStage<F> {
    /// Create a filter from a predicate.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: Fn(&Event) -> bool + Send> PipelineStage for FilterStage<F> {
    fn process(
        &mut self,
        event: Event,
        output: &mut StageOutput,
        _now: Timestamp,
    ) -> PipelineResult<()> {
        if (self.predicate)(&event) {
            output.push(event);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}
