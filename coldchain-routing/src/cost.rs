//! Travel Cost Model
//!
//! Cost of a leg is distance scaled by the road-condition weight and
//! the weather risk; lateness against a stop's window adds a
//! priority-weighted penalty. Travel time uses the base speed and the
//! road-condition weight only - risk makes a leg expensive, not slow.
//!
//! The weight and risk tables come from the original Nordic delivery
//! calibration: winter roads near mountain passes are the expensive
//! case, snow is the dominant weather term.

use coldchain_core::reading::Position;
use coldchain_core::time::Timestamp;

use crate::geo::haversine_km;
use crate::types::Stop;

/// Base travel speed on a highway in clear weather (km/h).
pub const BASE_SPEED_KMH: f64 = 60.0;

/// Fuel burn for a refrigerated delivery vehicle (liters per km,
/// 12 L/100 km).
pub const FUEL_L_PER_KM: f64 = 0.12;

/// Wind speed at or above which wind adds to the weather risk (km/h).
pub const WIND_RISK_THRESHOLD_KMH: f64 = 20.0;

/// Road condition along a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainKind {
    /// Highway driving.
    Highway,
    /// Ordinary paved road.
    PavedRoad,
    /// Gravel road.
    GravelRoad,
    /// Mountain pass.
    MountainPass,
    /// Winter-maintained road.
    WinterRoad,
}

impl TerrainKind {
    /// Travel weight relative to highway driving.
    pub const fn weight(&self) -> f64 {
        match self {
            TerrainKind::Highway => 1.0,
            TerrainKind::PavedRoad => 1.2,
            TerrainKind::GravelRoad => 1.5,
            TerrainKind::MountainPass => 2.0,
            TerrainKind::WinterRoad => 1.8,
        }
    }
}

/// Weather condition affecting the whole plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    /// No precipitation.
    Clear,
    /// Rain.
    Rain,
    /// Snow.
    Snow,
}

/// Current weather snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Weather {
    /// Condition.
    pub condition: WeatherCondition,
    /// Air temperature (°C).
    pub temperature: f64,
    /// Wind speed (km/h).
    pub wind_speed: f64,
}

impl Weather {
    /// Clear, calm weather.
    pub const fn clear() -> Self {
        Self {
            condition: WeatherCondition::Clear,
            temperature: 10.0,
            wind_speed: 0.0,
        }
    }

    /// Risk on a 0-1 scale. Base 0.1; snow adds 0.4, rain 0.2, strong
    /// wind 0.1; capped at 1.0.
    pub fn risk(&self) -> f64 {
        let mut risk = 0.1;
        match self.condition {
            WeatherCondition::Snow => risk += 0.4,
            WeatherCondition::Rain => risk += 0.2,
            WeatherCondition::Clear => {}
        }
        if self.wind_speed >= WIND_RISK_THRESHOLD_KMH {
            risk += 0.1;
        }
        if risk > 1.0 {
            1.0
        } else {
            risk
        }
    }
}

/// Cost model for one planning run. Terrain and weather are plan-wide;
/// per-leg terrain would need a road graph, which the planner does not
/// carry.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    /// Base speed (km/h).
    pub base_speed_kmh: f64,
    /// Road condition assumed for all legs.
    pub terrain: TerrainKind,
    /// Current weather.
    pub weather: Weather,
    /// Weight of the priority-scaled lateness penalty, in cost units
    /// per priority point per late minute.
    pub lateness_weight: f64,
}

impl CostModel {
    /// Paved-road model in given weather.
    pub fn new(weather: Weather) -> Self {
        Self {
            base_speed_kmh: BASE_SPEED_KMH,
            terrain: TerrainKind::PavedRoad,
            weather,
            lateness_weight: 1.0,
        }
    }

    /// Travel time for a leg in milliseconds.
    pub fn travel_time_ms(&self, from: Position, to: Position) -> u64 {
        let km = haversine_km(from, to);
        let hours = km / self.base_speed_kmh * self.terrain.weight();
        (hours * 3_600_000.0) as u64
    }

    /// Cost of a leg: weighted distance scaled by weather risk.
    pub fn leg_cost(&self, from: Position, to: Position) -> f64 {
        haversine_km(from, to) * self.terrain.weight() * (1.0 + self.weather.risk())
    }

    /// Priority-weighted penalty for arriving after the window closes.
    pub fn lateness_penalty(&self, stop: &Stop, arrival: Timestamp) -> f64 {
        if arrival <= stop.window.end {
            return 0.0;
        }
        let late_min = (arrival - stop.window.end) as f64 / 60_000.0;
        late_min * stop.priority as f64 * self.lateness_weight
    }

    /// Fuel estimate for a distance.
    pub fn fuel_liters(&self, distance_km: f64) -> f64 {
        distance_km * FUEL_L_PER_KM
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(Weather::clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeWindow;
    use coldchain_core::events::InlineString;

    #[test]
    fn weather_risk_table() {
        let mut w = Weather::clear();
        assert!((w.risk() - 0.1).abs() < 1e-9);

        w.condition = WeatherCondition::Rain;
        assert!((w.risk() - 0.3).abs() < 1e-9);

        w.condition = WeatherCondition::Snow;
        assert!((w.risk() - 0.5).abs() < 1e-9);

        w.wind_speed = 25.0;
        assert!((w.risk() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn terrain_weights_match_calibration() {
        assert_eq!(TerrainKind::Highway.weight(), 1.0);
        assert_eq!(TerrainKind::PavedRoad.weight(), 1.2);
        assert_eq!(TerrainKind::GravelRoad.weight(), 1.5);
        assert_eq!(TerrainKind::MountainPass.weight(), 2.0);
        assert_eq!(TerrainKind::WinterRoad.weight(), 1.8);
    }

    #[test]
    fn snow_makes_legs_more_expensive_not_slower() {
        let from = Position { lat: 63.43, lon: 10.39 };
        let to = Position { lat: 63.36, lon: 10.37 };

        let clear = CostModel::new(Weather::clear());
        let snow = CostModel::new(Weather {
            condition: WeatherCondition::Snow,
            temperature: -5.0,
            wind_speed: 0.0,
        });

        assert_eq!(
            clear.travel_time_ms(from, to),
            snow.travel_time_ms(from, to)
        );
        assert!(snow.leg_cost(from, to) > clear.leg_cost(from, to));
    }

    #[test]
    fn lateness_scales_with_priority() {
        let model = CostModel::default();
        let mut stop = Stop {
            id: InlineString::new("p1").unwrap(),
            position: Position { lat: 0.0, lon: 0.0 },
            window: TimeWindow { start: 0, end: 60_000 },
            priority: 2,
            demand: 1,
            service_time_ms: 0,
            emergency: false,
        };

        let low = model.lateness_penalty(&stop, 120_000);
        stop.priority = 8;
        let high = model.lateness_penalty(&stop, 120_000);

        assert!(high > low);
        assert_eq!(model.lateness_penalty(&stop, 60_000), 0.0);
    }
}
