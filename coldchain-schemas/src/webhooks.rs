//! Outbound webhook payloads.
//!
//! Two streams fan out of the controller: `temperature-alerts` for the
//! alert lifecycle and `delivery-updates` for route progress. Delivery
//! is at-least-once; consumers treat repeats of the same
//! `alert_id`/`status` pair as idempotent, so payloads carry enough to
//! dedup on.

use serde::{Deserialize, Serialize};

use coldchain_core::events::{AlertId, Event};
use coldchain_core::reading::Position;
use coldchain_routing::tracker::DeliveryEvent;

use crate::ingestion::LocationPayload;
use crate::time::format_rfc3339;
use crate::SchemaError;

/// One `temperature-alerts` webhook body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureAlertPayload {
    /// Alert identifier, stable across the alert's lifecycle.
    pub alert_id: AlertId,
    /// Sensor the alert belongs to.
    pub sensor_id: String,
    /// Temperature at the transition.
    pub temperature: f32,
    /// The violated zone bound; null once the alert resolves.
    pub threshold: Option<f32>,
    /// Lifecycle status: warning, critical, escalated, resolved.
    pub status: String,
    /// Transition time, RFC3339.
    pub timestamp: String,
}

impl TemperatureAlertPayload {
    /// Build from a pipeline event. `None` for events that are not part
    /// of the alert lifecycle.
    pub fn from_event(event: &Event) -> Result<Option<Self>, SchemaError> {
        let payload = match *event {
            Event::AlertRaised {
                alert_id,
                sensor_id,
                status,
                temperature,
                threshold,
                timestamp,
            }
            | Event::AlertEscalated {
                alert_id,
                sensor_id,
                status,
                temperature,
                threshold,
                timestamp,
            } => Self {
                alert_id,
                sensor_id: sensor_id.as_str().to_owned(),
                temperature,
                threshold: Some(threshold),
                status: status.as_str().to_owned(),
                timestamp: format_rfc3339(timestamp)?,
            },
            Event::AlertResolved {
                alert_id,
                sensor_id,
                temperature,
                timestamp,
            } => Self {
                alert_id,
                sensor_id: sensor_id.as_str().to_owned(),
                temperature,
                threshold: None,
                status: "resolved".to_owned(),
                timestamp: format_rfc3339(timestamp)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(payload))
    }
}

/// One `delivery-updates` webhook body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryUpdatePayload {
    /// The delivery (keyed by vehicle).
    pub delivery_id: String,
    /// What happened: departed, arrived, replanned.
    pub status: String,
    /// When, RFC3339.
    pub timestamp: String,
    /// Vehicle position at the event, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPayload>,
}

impl DeliveryUpdatePayload {
    /// Build from a tracker event.
    pub fn from_event(
        event: &DeliveryEvent,
        location: Option<Position>,
    ) -> Result<Self, SchemaError> {
        let (vehicle, status, timestamp) = match *event {
            DeliveryEvent::Departed {
                vehicle, timestamp, ..
            } => (vehicle, "departed", timestamp),
            DeliveryEvent::Arrived {
                vehicle, timestamp, ..
            } => (vehicle, "arrived", timestamp),
            DeliveryEvent::Replanned {
                vehicle, timestamp, ..
            } => (vehicle, "replanned", timestamp),
        };
        Ok(Self {
            delivery_id: vehicle.as_str().to_owned(),
            status: status.to_owned(),
            timestamp: format_rfc3339(timestamp)?,
            location: location.map(LocationPayload::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldchain_core::events::{AlertStatus, InlineString};
    use serde_json::json;

    fn id(s: &str) -> InlineString {
        InlineString::new(s).unwrap()
    }

    #[test]
    fn alert_webhook_wire_shape() {
        let event = Event::AlertRaised {
            alert_id: 42,
            sensor_id: id("fridge_vax_01"),
            status: AlertStatus::Warning,
            temperature: 9.2,
            threshold: 8.0,
            timestamp: 1_735_689_600_000,
        };

        let payload = TemperatureAlertPayload::from_event(&event)
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "alert_id": 42,
                "sensor_id": "fridge_vax_01",
                "temperature": 9.2f32,
                "threshold": 8.0f32,
                "status": "warning",
                "timestamp": "2025-01-01T00:00:00.000Z",
            })
        );
    }

    #[test]
    fn resolved_alert_has_null_threshold() {
        let event = Event::AlertResolved {
            alert_id: 42,
            sensor_id: id("fridge_vax_01"),
            temperature: 5.0,
            timestamp: 1_735_689_600_000,
        };

        let payload = TemperatureAlertPayload::from_event(&event)
            .unwrap()
            .unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["threshold"], json!(null));
        assert_eq!(value["status"], json!("resolved"));
    }

    #[test]
    fn non_alert_events_produce_no_webhook() {
        let event = Event::Classified {
            sensor_id: id("s1"),
            zone: coldchain_core::thresholds::Zone::Vaccines,
            severity: coldchain_core::events::Severity::Normal,
            temperature: 5.0,
            timestamp: 0,
            vehicle: None,
        };
        assert!(TemperatureAlertPayload::from_event(&event)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delivery_update_wire_shape() {
        let event = DeliveryEvent::Arrived {
            vehicle: id("van_07"),
            stop: id("pharm_3"),
            timestamp: 1_735_689_600_000,
        };

        let payload = DeliveryUpdatePayload::from_event(
            &event,
            Some(Position {
                lat: 63.43,
                lon: 10.4,
            }),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "delivery_id": "van_07",
                "status": "arrived",
                "timestamp": "2025-01-01T00:00:00.000Z",
                "location": {"lat": 63.43, "lon": 10.4},
            })
        );
    }
}
