//! Route optimization request and response payloads.
//!
//! The request names pharmacies with priorities and hard delivery
//! windows plus the current weather; the response is the ordered
//! schedule with per-stop timing and route totals. Window timestamps
//! are RFC3339 on the wire.

use serde::{Deserialize, Serialize};

use coldchain_core::events::InlineString;
use coldchain_core::reading::Position;
use coldchain_routing::cost::{CostModel, Weather, WeatherCondition};
use coldchain_routing::types::{Route, Stop, TimeWindow, MAX_STOPS};

use crate::time::{format_rfc3339, parse_rfc3339};
use crate::SchemaError;

/// On-site service time assumed when the request does not model it
/// (10 minutes).
pub const DEFAULT_SERVICE_TIME_MS: u64 = 10 * 60_000;

fn default_demand() -> u32 {
    1
}

/// Hard delivery window, RFC3339 bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPayload {
    /// Earliest service start.
    pub start: String,
    /// Latest acceptable arrival.
    pub end: String,
}

/// One requested pharmacy stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopPayload {
    /// Pharmacy identifier.
    pub pharmacy_id: String,
    /// Delivery latitude in degrees.
    pub latitude: f64,
    /// Delivery longitude in degrees.
    pub longitude: f64,
    /// Priority 1-10, higher is more critical.
    pub priority: u8,
    /// Load units this delivery consumes. Defaults to 1 when absent.
    #[serde(default = "default_demand")]
    pub demand: u32,
    /// Hard delivery window.
    pub delivery_window: WindowPayload,
}

impl StopPayload {
    /// Convert to a domain stop.
    pub fn to_stop(&self) -> Result<Stop, SchemaError> {
        let id = InlineString::new(&self.pharmacy_id)
            .ok_or_else(|| SchemaError::IdTooLong(self.pharmacy_id.clone()))?;
        Ok(Stop {
            id,
            position: Position {
                lat: self.latitude,
                lon: self.longitude,
            },
            window: TimeWindow {
                start: parse_rfc3339(&self.delivery_window.start)?,
                end: parse_rfc3339(&self.delivery_window.end)?,
            },
            priority: self.priority,
            demand: self.demand,
            service_time_ms: DEFAULT_SERVICE_TIME_MS,
            emergency: false,
        })
    }
}

/// Current weather snapshot on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherPayload {
    /// Condition: `clear`, `rain`, or `snow`.
    pub condition: String,
    /// Air temperature (°C).
    pub temperature: f64,
    /// Wind speed (km/h).
    pub wind_speed: f64,
}

impl WeatherPayload {
    /// Convert to the domain weather snapshot.
    pub fn to_weather(&self) -> Result<Weather, SchemaError> {
        let condition = match self.condition.as_str() {
            "clear" => WeatherCondition::Clear,
            "rain" => WeatherCondition::Rain,
            "snow" => WeatherCondition::Snow,
            other => return Err(SchemaError::UnknownWeatherCondition(other.to_owned())),
        };
        Ok(Weather {
            condition,
            temperature: self.temperature,
            wind_speed: self.wind_speed,
        })
    }
}

/// A route optimization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    /// Requested stops, unordered.
    pub stops: Vec<StopPayload>,
    /// Vehicle load capacity in the same units as stop demand.
    pub vehicle_capacity: u32,
    /// Weather applied to the whole plan.
    pub current_weather: WeatherPayload,
}

impl OptimizeRequest {
    /// Parse a request from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert the stop list to domain stops.
    pub fn to_stops(&self) -> Result<Vec<Stop>, SchemaError> {
        if self.stops.len() > MAX_STOPS {
            return Err(SchemaError::TooManyStops(self.stops.len()));
        }
        self.stops.iter().map(StopPayload::to_stop).collect()
    }

    /// Cost model for this request's weather.
    pub fn cost_model(&self) -> Result<CostModel, SchemaError> {
        Ok(CostModel::new(self.current_weather.to_weather()?))
    }
}

/// One stop in the optimized schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStopPayload {
    /// Visit order, starting at 1.
    pub sequence: u32,
    /// Pharmacy identifier.
    pub pharmacy_id: String,
    /// Planned arrival, RFC3339.
    pub estimated_arrival: String,
    /// Planned departure, RFC3339.
    pub estimated_departure: String,
}

/// A route optimization response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    /// Route identifier, stable across queries for one plan version.
    pub route_id: String,
    /// Stops in visit order.
    pub optimized_route: Vec<RouteStopPayload>,
    /// Total driving distance.
    pub total_distance_km: f64,
    /// Total duration including service and waits.
    pub total_duration_min: u64,
    /// Fuel estimate for the whole route.
    pub fuel_estimate_liters: f64,
}

impl OptimizeResponse {
    /// Build the response for a planned route.
    pub fn from_route(route: &Route) -> Result<Self, SchemaError> {
        let mut optimized_route = Vec::with_capacity(route.stops.len());
        for (i, planned) in route.stops.iter().enumerate() {
            optimized_route.push(RouteStopPayload {
                sequence: (i + 1) as u32,
                pharmacy_id: planned.stop.id.as_str().to_owned(),
                estimated_arrival: format_rfc3339(planned.arrival)?,
                estimated_departure: format_rfc3339(planned.departure)?,
            });
        }
        Ok(Self {
            route_id: format!("route_{}_v{}", route.vehicle, route.version),
            optimized_route,
            total_distance_km: route.total_distance_km,
            total_duration_min: route.total_duration_ms / 60_000,
            fuel_estimate_liters: route.fuel_liters,
        })
    }
}
