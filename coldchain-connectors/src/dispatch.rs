//! Dispatch loop.
//!
//! Wires the connectors to the core: readings from the broker go
//! through the pipeline, pipeline output fans out as webhooks, and
//! `ReplanNeeded` events cross over to the delivery tracker. A
//! periodic tick drives the hold timers and the liveness watchdog, so
//! a sensor that goes silent still escalates on schedule.
//!
//! Readings are processed one at a time in arrival order; per-sensor
//! ordering needs no locking because the validation gate absorbs or
//! rejects anything out of order. Re-plan serialization is the
//! tracker's job - the dispatcher just keeps running requests until
//! the tracker stops handing them back.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use coldchain_core::events::{Event, InlineString};
use coldchain_core::pipeline::{Pipeline, PipelineError};
use coldchain_core::reading::{Position, RawReading};
use coldchain_core::time::{TimeSource, Timestamp};
use coldchain_routing::errors::RoutingError;
use coldchain_routing::optimizer::Optimizer;
use coldchain_routing::replan::{insert_emergency, replan};
use coldchain_routing::tracker::{
    ApplyOutcome, DeliveryEvent, DeliveryTracker, EtaEstimate, ReplanRequest, ReplanTrigger,
};
use coldchain_routing::types::Stop;
use coldchain_schemas::{DeliveryUpdatePayload, SchemaError, TemperatureAlertPayload};

#[cfg(feature = "mqtt")]
use crate::mqtt::MqttIngest;

/// Pipeline event queue capacity for the dispatcher.
pub const QUEUE_CAPACITY: usize = 64;

/// Vehicles one dispatcher instance tracks.
pub const MAX_FLEET: usize = 8;

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Pipeline processing failure.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Routing or tracker failure.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Payload conversion failure.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Broker connection failure.
    #[cfg(feature = "mqtt")]
    #[error("mqtt error: {0}")]
    Mqtt(#[from] crate::mqtt::MqttError),
}

/// Where outbound notifications go.
///
/// Delivery failures are the sink's problem (retries, unresolved
/// counters); the dispatch loop never stalls on them.
#[async_trait]
pub trait NotificationSink: Send {
    /// Fan out a `temperature-alerts` notification.
    async fn alert(&mut self, payload: &TemperatureAlertPayload);

    /// Fan out a `delivery-updates` notification.
    async fn delivery_update(&mut self, payload: &DeliveryUpdatePayload);
}

#[cfg(feature = "webhook")]
#[async_trait]
impl NotificationSink for crate::webhook::WebhookSink {
    async fn alert(&mut self, payload: &TemperatureAlertPayload) {
        if let Err(e) = self.send_alert(payload).await {
            log::warn!("alert webhook for {} failed: {}", payload.sensor_id, e);
        }
    }

    async fn delivery_update(&mut self, payload: &DeliveryUpdatePayload) {
        if let Err(e) = self.send_delivery_update(payload).await {
            log::warn!("delivery webhook for {} failed: {}", payload.delivery_id, e);
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Timer/liveness tick interval.
    pub tick_interval: Duration,
    /// Events drained per pipeline batch.
    pub batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            batch_size: 32,
        }
    }
}

/// The dispatch loop state: pipeline, tracker, and planner.
pub struct Dispatcher<C: TimeSource> {
    pipeline: Pipeline<QUEUE_CAPACITY>,
    tracker: DeliveryTracker<MAX_FLEET>,
    optimizer: Optimizer,
    clock: C,
    config: DispatchConfig,
}

impl<C: TimeSource> Dispatcher<C> {
    /// Assemble a dispatcher.
    pub fn new(
        pipeline: Pipeline<QUEUE_CAPACITY>,
        tracker: DeliveryTracker<MAX_FLEET>,
        optimizer: Optimizer,
        clock: C,
        config: DispatchConfig,
    ) -> Self {
        Self {
            pipeline,
            tracker,
            optimizer,
            clock,
            config,
        }
    }

    /// The delivery tracker, for route assignment and queries.
    pub fn tracker(&self) -> &DeliveryTracker<MAX_FLEET> {
        &self.tracker
    }

    /// Mutable tracker access.
    pub fn tracker_mut(&mut self) -> &mut DeliveryTracker<MAX_FLEET> {
        &mut self.tracker
    }

    /// Run forever: broker readings and periodic ticks, webhooks out.
    #[cfg(feature = "mqtt")]
    pub async fn run<S: NotificationSink>(
        &mut self,
        ingest: &mut MqttIngest,
        sink: &mut S,
    ) -> Result<(), DispatchError> {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                reading = ingest.next_reading() => {
                    self.ingest_reading(reading?, self.clock.now())?;
                    self.drain(sink, self.clock.now()).await;
                }
                _ = ticker.tick() => {
                    self.pipeline.tick(self.clock.now());
                    self.drain(sink, self.clock.now()).await;
                }
            }
        }
    }

    /// Push one reading through the pipeline.
    pub fn ingest_reading(&mut self, reading: RawReading, now: Timestamp) -> Result<(), DispatchError> {
        if !self.pipeline.push_event(Event::ReadingReceived { reading }) {
            log::warn!("pipeline input queue full, reading dropped");
        }
        self.pipeline.process_batch(self.config.batch_size, now)?;
        Ok(())
    }

    /// Advance pipeline timers without a reading.
    pub fn tick(&mut self, now: Timestamp) {
        self.pipeline.tick(now);
    }

    /// Drain pipeline output: alert webhooks out, replan triggers over
    /// to the tracker.
    pub async fn drain<S: NotificationSink>(&mut self, sink: &mut S, now: Timestamp) {
        while let Some(event) = self.pipeline.pop_result() {
            match TemperatureAlertPayload::from_event(&event) {
                Ok(Some(payload)) => sink.alert(&payload).await,
                Ok(None) => {}
                Err(e) => log::warn!("alert payload conversion failed: {e}"),
            }

            if let Event::ReplanNeeded {
                vehicle, sensor_id, ..
            } = event
            {
                match self.tracker.on_alert_escalated(&vehicle, sensor_id) {
                    Ok(Some(request)) => self.run_replan(request, sink, now).await,
                    Ok(None) => {} // coalesced into the in-flight request
                    Err(e) => log::warn!("replan trigger for {vehicle} dropped: {e}"),
                }
            }
        }
    }

    /// Record a vehicle position update, re-planning on a window miss.
    pub async fn position_update<S: NotificationSink>(
        &mut self,
        vehicle: &InlineString,
        position: Position,
        now: Timestamp,
        sink: &mut S,
    ) -> Result<Option<EtaEstimate>, DispatchError> {
        let (eta, request) = self.tracker.position_update(vehicle, position, now)?;
        if let Some(request) = request {
            self.run_replan(request, sink, now).await;
        }
        Ok(eta)
    }

    /// Record arrival at the next stop and fan out the updates.
    pub async fn arrive<S: NotificationSink>(
        &mut self,
        vehicle: &InlineString,
        now: Timestamp,
        sink: &mut S,
    ) -> Result<(), DispatchError> {
        let events = self.tracker.arrive(vehicle, now)?;
        self.emit_updates(&events, sink).await;
        Ok(())
    }

    /// Insert an emergency stop into a vehicle's route. A request
    /// already in flight coalesces; the stop rides on the trigger and
    /// the planner inserts it when that request's turn comes.
    pub async fn emergency_stop<S: NotificationSink>(
        &mut self,
        vehicle: &InlineString,
        stop: Stop,
        now: Timestamp,
        sink: &mut S,
    ) -> Result<(), DispatchError> {
        if let Some(request) = self.tracker.on_emergency_stop(vehicle, stop)? {
            self.run_replan(request, sink, now).await;
        }
        Ok(())
    }

    /// Run the planner for a request and apply the result; keeps going
    /// while the tracker hands back coalesced follow-ups.
    async fn run_replan<S: NotificationSink>(
        &mut self,
        mut request: ReplanRequest,
        sink: &mut S,
        now: Timestamp,
    ) {
        loop {
            let Some(route) = self.tracker.route(&request.vehicle).cloned() else {
                return;
            };
            let Some(vehicle) = self.tracker.vehicle(&request.vehicle).copied() else {
                return;
            };

            let result = match request.trigger {
                ReplanTrigger::EmergencyStop { stop } => {
                    insert_emergency(&self.optimizer, &route, stop, &vehicle, now)
                }
                _ => replan(&self.optimizer, &route, &vehicle, now),
            };
            match self
                .tracker
                .apply_result(&request.vehicle, request.generation, result.route, now)
            {
                Ok((outcome, events)) => {
                    self.emit_updates(&events, sink).await;
                    match outcome {
                        ApplyOutcome::AppliedPendingNext(next) => request = next,
                        ApplyOutcome::Applied | ApplyOutcome::Discarded => return,
                    }
                }
                Err(e) => {
                    log::warn!("plan result for {} not applied: {}", request.vehicle, e);
                    return;
                }
            }
        }
    }

    async fn emit_updates<S: NotificationSink>(&self, events: &[DeliveryEvent], sink: &mut S) {
        for event in events {
            let id = match event {
                DeliveryEvent::Departed { vehicle, .. }
                | DeliveryEvent::Arrived { vehicle, .. }
                | DeliveryEvent::Replanned { vehicle, .. } => vehicle,
            };
            let location = self.tracker.vehicle(id).map(|v| v.position);
            match DeliveryUpdatePayload::from_event(event, location) {
                Ok(payload) => sink.delivery_update(&payload).await,
                Err(e) => log::warn!("delivery payload conversion failed: {e}"),
            }
        }
    }
}
