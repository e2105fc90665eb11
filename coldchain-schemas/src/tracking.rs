//! Delivery tracking query payload.
//!
//! Answers "where is my delivery and has it stayed cold": current
//! position, next stop, and the recent temperature readings from the
//! vehicle's sensors.

use serde::{Deserialize, Serialize};

use coldchain_core::stats::StatSample;
use coldchain_core::reading::Position;

use crate::ingestion::LocationPayload;
use crate::time::format_rfc3339;
use crate::SchemaError;

/// Delivery lifecycle status in tracking answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Route assigned, not yet departed.
    Scheduled,
    /// En route to the next stop.
    InTransit,
    /// At a stop, being serviced.
    Arrived,
    /// All stops on the route visited.
    Completed,
}

/// One retained temperature reading in a tracking answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureReadingPayload {
    /// Reading timestamp, RFC3339.
    pub timestamp: String,
    /// Temperature in Celsius.
    pub temperature: f32,
    /// Classification at the time of the reading.
    pub status: String,
}

impl TemperatureReadingPayload {
    /// Build from a retained statistics sample.
    pub fn from_sample(sample: &StatSample) -> Result<Self, SchemaError> {
        Ok(Self {
            timestamp: format_rfc3339(sample.timestamp)?,
            temperature: sample.temperature,
            status: sample.severity.as_str().to_owned(),
        })
    }
}

/// The tracking query answer for one delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingStatus {
    /// Delivery identifier (the vehicle's active route).
    pub delivery_id: String,
    /// Lifecycle status.
    pub status: DeliveryStatus,
    /// Last known vehicle position.
    pub current_location: LocationPayload,
    /// Next unvisited stop, absent when the route is complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_stop: Option<String>,
    /// Recent temperature readings, newest first.
    pub temperature_readings: Vec<TemperatureReadingPayload>,
}

impl TrackingStatus {
    /// Build an answer without readings attached yet.
    pub fn new(
        delivery_id: String,
        status: DeliveryStatus,
        position: Position,
        next_stop: Option<String>,
    ) -> Self {
        Self {
            delivery_id,
            status,
            current_location: position.into(),
            next_stop,
            temperature_readings: Vec::new(),
        }
    }

    /// Attach retained readings, newest first as given.
    pub fn with_readings(mut self, samples: &[StatSample]) -> Result<Self, SchemaError> {
        self.temperature_readings.reserve(samples.len());
        for sample in samples {
            self.temperature_readings
                .push(TemperatureReadingPayload::from_sample(sample)?);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldchain_core::events::Severity;
    use serde_json::json;

    #[test]
    fn tracking_answer_wire_shape() {
        let samples = [
            StatSample {
                timestamp: 2_000,
                temperature: 5.1,
                severity: Severity::Normal,
            },
            StatSample {
                timestamp: 1_000,
                temperature: 9.2,
                severity: Severity::Warning,
            },
        ];

        let answer = TrackingStatus::new(
            "route_van_07_v2".into(),
            DeliveryStatus::InTransit,
            Position {
                lat: 63.43,
                lon: 10.4,
            },
            Some("pharm_trondheim_3".into()),
        )
        .with_readings(&samples)
        .unwrap();

        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value["delivery_id"], json!("route_van_07_v2"));
        assert_eq!(value["status"], json!("in_transit"));
        assert_eq!(value["current_location"]["lat"], json!(63.43));
        assert_eq!(value["next_stop"], json!("pharm_trondheim_3"));
        assert_eq!(value["temperature_readings"][1]["status"], json!("warning"));
    }

    #[test]
    fn completed_delivery_omits_next_stop() {
        let answer = TrackingStatus::new(
            "route_van_07_v2".into(),
            DeliveryStatus::Completed,
            Position { lat: 0.0, lon: 0.0 },
            None,
        );
        let value = serde_json::to_value(&answer).unwrap();
        assert!(value.get("next_stop").is_none());
        assert_eq!(value["status"], json!("completed"));
    }
}
