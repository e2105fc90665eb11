//! Delivery Tracker
//!
//! The single writer for vehicle route state. The optimizer only ever
//! produces candidate routes; nothing becomes a vehicle's active route
//! except through [`DeliveryTracker::apply_result`].
//!
//! ## Replan request lifecycle
//!
//! Per vehicle, requests move through `Idle → InFlight → InFlight+
//! Pending`. The first trigger starts a request (with a generation
//! number); any further trigger while one is in flight coalesces into a
//! single pending request that fires when the result lands. A result is
//! applied only if the vehicle is still active and its generation
//! matches - anything else is discarded as stale.
//!
//! Triggers:
//! - an escalated temperature alert names a sensor aboard the vehicle
//! - a position update implies a window miss beyond tolerance
//! - an emergency stop is inserted

use heapless::{FnvIndexMap, Vec};

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_core::time::Timestamp;

use crate::cost::CostModel;
use crate::errors::RoutingError;
use crate::geo::haversine_km;
use crate::types::{Route, Stop, Vehicle};

/// How far past a stop's window end an ETA may slip before the slip
/// itself triggers a re-plan (5 minutes).
pub const WINDOW_MISS_TOLERANCE_MS: u64 = 5 * 60_000;

/// Why a re-plan was requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplanTrigger {
    /// An escalated alert names a sensor aboard this vehicle.
    AlertEscalated {
        /// The sensor whose alert escalated.
        sensor_id: InlineString,
    },
    /// Projected arrival misses the next stop's window beyond tolerance.
    WindowMiss {
        /// The stop whose window will be missed.
        stop: InlineString,
    },
    /// An emergency stop needs inserting; the stop rides along so the
    /// planner can insert it when the request finally runs.
    EmergencyStop {
        /// The stop to insert.
        stop: Stop,
    },
}

/// A re-plan request handed to the planning layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplanRequest {
    /// Vehicle to re-plan.
    pub vehicle: InlineString,
    /// Generation; results must echo it back.
    pub generation: u32,
    /// The trigger that started (or most recently refreshed) it.
    pub trigger: ReplanTrigger,
}

/// What happened to a submitted plan result.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Result installed as the vehicle's active route.
    Applied,
    /// Result installed, and a coalesced request fires immediately.
    AppliedPendingNext(ReplanRequest),
    /// Result was stale (generation mismatch, vehicle inactive, or no
    /// request in flight) and was discarded.
    Discarded,
}

/// Events for the `delivery-updates` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// Vehicle departed toward a stop.
    Departed {
        /// The vehicle.
        vehicle: InlineString,
        /// Next stop.
        stop: InlineString,
        /// When.
        timestamp: Timestamp,
    },
    /// Vehicle arrived at a stop.
    Arrived {
        /// The vehicle.
        vehicle: InlineString,
        /// The stop.
        stop: InlineString,
        /// When.
        timestamp: Timestamp,
    },
    /// A new route version was installed.
    Replanned {
        /// The vehicle.
        vehicle: InlineString,
        /// New route version.
        version: u32,
        /// When.
        timestamp: Timestamp,
    },
}

/// ETA estimate for a vehicle's next stop.
#[derive(Debug, Clone, Copy)]
pub struct EtaEstimate {
    /// The next stop.
    pub stop: InlineString,
    /// Estimated arrival.
    pub eta: Timestamp,
    /// The stop's window end, for slip checks.
    pub window_end: Timestamp,
}

/// Replan request state for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RequestState {
    Idle,
    InFlight { generation: u32 },
    InFlightPending { generation: u32, trigger: ReplanTrigger },
}

struct VehicleState {
    vehicle: Vehicle,
    route: Option<Route>,
    request: RequestState,
    next_generation: u32,
    active: bool,
}

/// Per-vehicle delivery state for up to `N` vehicles.
pub struct DeliveryTracker<const N: usize> {
    vehicles: FnvIndexMap<InlineString, VehicleState, N>,
    cost: CostModel,
}

/// Events one tracker call can emit.
pub type TrackerOutput = Vec<DeliveryEvent, 4>;

impl<const N: usize> DeliveryTracker<N> {
    /// Create a tracker using `cost` for ETA estimates.
    pub fn new(cost: CostModel) -> Self {
        Self {
            vehicles: FnvIndexMap::new(),
            cost,
        }
    }

    /// Register a vehicle.
    pub fn register(&mut self, vehicle: Vehicle) -> Result<(), RoutingError> {
        let state = VehicleState {
            vehicle,
            route: None,
            request: RequestState::Idle,
            next_generation: 1,
            active: true,
        };
        self.vehicles
            .insert(vehicle.id, state)
            .map(|_| ())
            .map_err(|_| RoutingError::TableFull)
    }

    /// Deactivate a vehicle. In-flight plan results for it will be
    /// discarded on arrival.
    pub fn deactivate(&mut self, id: &InlineString) -> Result<(), RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;
        state.active = false;
        Ok(())
    }

    /// Install an initial route directly (no request cycle). Emits a
    /// departure toward the first stop.
    pub fn assign_route(
        &mut self,
        id: &InlineString,
        route: Route,
        now: Timestamp,
    ) -> Result<TrackerOutput, RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;

        let mut out = TrackerOutput::new();
        if let Some(first) = route.stops.get(route.frozen_prefix) {
            let _ = out.push(DeliveryEvent::Departed {
                vehicle: *id,
                stop: first.stop.id,
                timestamp: now,
            });
        }
        state.route = Some(route);
        Ok(out)
    }

    /// The vehicle's active route.
    pub fn route(&self, id: &InlineString) -> Option<&Route> {
        self.vehicles.get(id).and_then(|s| s.route.as_ref())
    }

    /// The registered vehicle, with its last known position.
    pub fn vehicle(&self, id: &InlineString) -> Option<&Vehicle> {
        self.vehicles.get(id).map(|s| &s.vehicle)
    }

    /// The next unvisited stop.
    pub fn next_stop(&self, id: &InlineString) -> Option<&Stop> {
        self.route(id)
            .and_then(|r| r.suffix().first())
            .map(|p| &p.stop)
    }

    /// Record a position update. Returns the ETA for the next stop, and
    /// internally requests a re-plan when the ETA misses the window
    /// beyond tolerance - the request surfaces via the returned option
    /// pair.
    pub fn position_update(
        &mut self,
        id: &InlineString,
        position: Position,
        now: Timestamp,
    ) -> Result<(Option<EtaEstimate>, Option<ReplanRequest>), RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;
        state.vehicle.position = position;

        let Some(next) = state
            .route
            .as_ref()
            .and_then(|r| r.suffix().first())
            .map(|p| p.stop)
        else {
            return Ok((None, None));
        };

        let eta = now + self.cost.travel_time_ms(position, next.position);
        let estimate = EtaEstimate {
            stop: next.id,
            eta,
            window_end: next.window.end,
        };

        let request = if eta > next.window.end + WINDOW_MISS_TOLERANCE_MS {
            self.start_or_coalesce(id, ReplanTrigger::WindowMiss { stop: next.id })?
        } else {
            None
        };

        Ok((Some(estimate), request))
    }

    /// Record arrival at the next stop: the frozen prefix advances past
    /// it and a departure toward the following stop is emitted.
    pub fn arrive(
        &mut self,
        id: &InlineString,
        now: Timestamp,
    ) -> Result<TrackerOutput, RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;
        let route = state.route.as_mut().ok_or(RoutingError::NoActiveRoute)?;

        let Some(current) = route.stops.get(route.frozen_prefix).map(|p| p.stop) else {
            return Err(RoutingError::NoActiveRoute);
        };

        route.frozen_prefix += 1;
        state.vehicle.position = current.position;

        let mut out = TrackerOutput::new();
        let _ = out.push(DeliveryEvent::Arrived {
            vehicle: *id,
            stop: current.id,
            timestamp: now,
        });
        if let Some(next) = route.stops.get(route.frozen_prefix) {
            let _ = out.push(DeliveryEvent::Departed {
                vehicle: *id,
                stop: next.stop.id,
                timestamp: now,
            });
        }
        Ok(out)
    }

    /// Handle an escalated alert for a sensor riding on this vehicle.
    pub fn on_alert_escalated(
        &mut self,
        id: &InlineString,
        sensor_id: InlineString,
    ) -> Result<Option<ReplanRequest>, RoutingError> {
        self.start_or_coalesce(id, ReplanTrigger::AlertEscalated { sensor_id })
    }

    /// Handle an emergency stop insertion trigger. The stop travels with
    /// the request so a coalesced emergency still reaches the planner.
    pub fn on_emergency_stop(
        &mut self,
        id: &InlineString,
        stop: Stop,
    ) -> Result<Option<ReplanRequest>, RoutingError> {
        self.start_or_coalesce(id, ReplanTrigger::EmergencyStop { stop })
    }

    /// Submit a plan result. Applied only when the vehicle is active and
    /// `generation` matches the in-flight request; a coalesced pending
    /// trigger fires as a fresh request in the same call.
    pub fn apply_result(
        &mut self,
        id: &InlineString,
        generation: u32,
        route: Route,
        now: Timestamp,
    ) -> Result<(ApplyOutcome, TrackerOutput), RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;

        if !state.active {
            state.request = RequestState::Idle;
            return Ok((ApplyOutcome::Discarded, TrackerOutput::new()));
        }

        let (matches, pending) = match state.request {
            RequestState::InFlight { generation: g } => (g == generation, None),
            RequestState::InFlightPending {
                generation: g,
                trigger,
            } => (g == generation, Some(trigger)),
            RequestState::Idle => (false, None),
        };

        if !matches {
            #[cfg(feature = "log")]
            log::warn!(
                "discarding stale plan result generation {} for {}",
                generation,
                id
            );
            return Ok((ApplyOutcome::Discarded, TrackerOutput::new()));
        }

        let version = route.version;
        state.route = Some(route);

        let mut out = TrackerOutput::new();
        let _ = out.push(DeliveryEvent::Replanned {
            vehicle: *id,
            version,
            timestamp: now,
        });

        let outcome = match pending {
            Some(trigger) => {
                let generation = state.next_generation;
                state.next_generation += 1;
                state.request = RequestState::InFlight { generation };
                ApplyOutcome::AppliedPendingNext(ReplanRequest {
                    vehicle: *id,
                    generation,
                    trigger,
                })
            }
            None => {
                state.request = RequestState::Idle;
                ApplyOutcome::Applied
            }
        };

        Ok((outcome, out))
    }

    /// Straight-line distance from the vehicle to its next stop, for
    /// tracking queries.
    pub fn distance_to_next_km(&self, id: &InlineString) -> Option<f64> {
        let state = self.vehicles.get(id)?;
        let next = state.route.as_ref()?.suffix().first()?;
        Some(haversine_km(state.vehicle.position, next.stop.position))
    }

    /// Start a request or coalesce into the in-flight one. `Some` means
    /// the caller should run the planner now.
    fn start_or_coalesce(
        &mut self,
        id: &InlineString,
        trigger: ReplanTrigger,
    ) -> Result<Option<ReplanRequest>, RoutingError> {
        let state = self
            .vehicles
            .get_mut(id)
            .ok_or(RoutingError::UnknownVehicle)?;

        match state.request {
            RequestState::Idle => {
                let generation = state.next_generation;
                state.next_generation += 1;
                state.request = RequestState::InFlight { generation };
                Ok(Some(ReplanRequest {
                    vehicle: *id,
                    generation,
                    trigger,
                }))
            }
            RequestState::InFlight { generation } => {
                // Coalesce: one pending request carrying the latest trigger
                state.request = RequestState::InFlightPending {
                    generation,
                    trigger,
                };
                Ok(None)
            }
            RequestState::InFlightPending { generation, .. } => {
                state.request = RequestState::InFlightPending {
                    generation,
                    trigger,
                };
                Ok(None)
            }
        }
    }
}
