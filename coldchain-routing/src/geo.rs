//! Great-Circle Distance
//!
//! Haversine on a spherical Earth. Accurate to well under a percent at
//! delivery-route scale, and needs only `libm` trigonometry so it works
//! without std.

use coldchain_core::reading::Position;
use libm::{atan2, cos, sin, sqrt};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two positions in kilometers.
pub fn haversine_km(a: Position, b: Position) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = sin(dlat / 2.0) * sin(dlat / 2.0)
        + cos(lat1) * cos(lat2) * sin(dlon / 2.0) * sin(dlon / 2.0);
    let c = 2.0 * atan2(sqrt(h), sqrt(1.0 - h));

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        let p = Position {
            lat: 63.43,
            lon: 10.39,
        };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn known_distance_trondheim_oslo() {
        let trondheim = Position {
            lat: 63.4305,
            lon: 10.3951,
        };
        let oslo = Position {
            lat: 59.9139,
            lon: 10.7522,
        };
        let d = haversine_km(trondheim, oslo);
        // Great-circle distance is roughly 392 km
        assert!((d - 392.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = Position {
            lat: 63.43,
            lon: 10.39,
        };
        let b = Position {
            lat: 63.36,
            lon: 10.37,
        };
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }
}
