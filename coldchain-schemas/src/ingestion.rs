//! Sensor ingestion payloads.
//!
//! The shape every connector delivers readings in, and the rejection
//! object the gate answers with when a reading fails validation.

use serde::{Deserialize, Serialize};

use coldchain_core::errors::ValidationError;
use coldchain_core::events::InlineString;
use coldchain_core::reading::{Position, RawReading};

use crate::time::{format_rfc3339, parse_rfc3339};
use crate::SchemaError;

/// Geographic position on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl From<Position> for LocationPayload {
    fn from(p: Position) -> Self {
        Self { lat: p.lat, lon: p.lon }
    }
}

impl From<LocationPayload> for Position {
    fn from(p: LocationPayload) -> Self {
        Self { lat: p.lat, lon: p.lon }
    }
}

/// One sensor reading as delivered by a connector.
///
/// `location` is present only for in-transit sensors; `timestamp` is
/// the sensor's own clock, validated against the reference clock by
/// the ingestion gate, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    /// Reporting sensor id.
    pub sensor_id: String,
    /// Temperature in Celsius.
    pub temperature: f32,
    /// Relative humidity percentage.
    pub humidity: f32,
    /// Battery level percentage.
    pub battery_level: f32,
    /// Position for in-transit sensors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPayload>,
    /// Reading timestamp, RFC3339.
    pub timestamp: String,
}

impl ReadingPayload {
    /// Parse a payload from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert to the domain reading handed to the validation stage.
    pub fn to_reading(&self) -> Result<RawReading, SchemaError> {
        let sensor_id = InlineString::new(&self.sensor_id)
            .ok_or_else(|| SchemaError::IdTooLong(self.sensor_id.clone()))?;
        Ok(RawReading {
            sensor_id,
            temperature: self.temperature,
            humidity: self.humidity,
            battery_level: self.battery_level,
            position: self.location.map(Position::from),
            timestamp: parse_rfc3339(&self.timestamp)?,
        })
    }

    /// Build a payload back from a domain reading.
    pub fn from_reading(reading: &RawReading) -> Result<Self, SchemaError> {
        Ok(Self {
            sensor_id: reading.sensor_id.as_str().to_owned(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            battery_level: reading.battery_level,
            location: reading.position.map(LocationPayload::from),
            timestamp: format_rfc3339(reading.timestamp)?,
        })
    }
}

/// The `{field, issue}` rejection object returned for invalid readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionPayload {
    /// Wire field the rejection refers to.
    pub field: String,
    /// Machine-readable issue code.
    pub issue: String,
}

impl From<&ValidationError> for RejectionPayload {
    fn from(err: &ValidationError) -> Self {
        Self {
            field: err.field().to_owned(),
            issue: err.issue().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reading_wire_shape_is_exact() {
        let payload = ReadingPayload {
            sensor_id: "fridge_vax_01".into(),
            temperature: 9.2,
            humidity: 45.0,
            battery_level: 88.0,
            location: Some(LocationPayload { lat: 63.43, lon: 10.4 }),
            timestamp: "2025-01-01T00:00:00.000Z".into(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "sensor_id": "fridge_vax_01",
                "temperature": 9.2f32,
                "humidity": 45.0f32,
                "battery_level": 88.0f32,
                "location": {"lat": 63.43, "lon": 10.4},
                "timestamp": "2025-01-01T00:00:00.000Z",
            })
        );
    }

    #[test]
    fn stationary_reading_omits_location() {
        let payload = ReadingPayload {
            sensor_id: "fridge_vax_01".into(),
            temperature: 4.0,
            humidity: 45.0,
            battery_level: 88.0,
            location: None,
            timestamp: "2025-01-01T00:00:00.000Z".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("location").is_none());
    }

    #[test]
    fn converts_to_domain_reading() {
        let payload = ReadingPayload::from_json(
            r#"{"sensor_id":"s1","temperature":5.5,"humidity":40.0,
                "battery_level":90.0,"timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let reading = payload.to_reading().unwrap();
        assert_eq!(reading.sensor_id.as_str(), "s1");
        assert_eq!(reading.timestamp, 1_735_689_600_000);
        assert!(reading.position.is_none());
    }

    #[test]
    fn oversized_sensor_id_is_a_schema_error() {
        let payload = ReadingPayload {
            sensor_id: "this_sensor_id_is_far_too_long_for_inline_storage".into(),
            temperature: 5.0,
            humidity: 45.0,
            battery_level: 88.0,
            location: None,
            timestamp: "2025-01-01T00:00:00Z".into(),
        };
        assert!(matches!(
            payload.to_reading(),
            Err(SchemaError::IdTooLong(_))
        ));
    }

    #[test]
    fn rejection_object_from_validation_error() {
        let err = ValidationError::OutOfPhysicalRange {
            value: 81.0,
            min: -50.0,
            max: 50.0,
        };
        let rejection = RejectionPayload::from(&err);
        assert_eq!(
            serde_json::to_value(&rejection).unwrap(),
            json!({"field": "temperature", "issue": "out_of_physical_range"})
        );
    }
}
