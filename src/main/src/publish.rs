use std::cell::RefCell;
use std::io::Write;

use control::{CalculationMode, Temperature};
use log::*;
use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::installation::InstallationId;

/// The derived flow temperature as the host displays it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowState {
    Available(Temperature),
    Unavailable,
}

// Absence must be explicit on the wire, never a null or a zero
impl Serialize for FlowState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlowState::Available(temperature) => temperature.serialize(serializer),
            FlowState::Unavailable => serializer.serialize_str(crate::sensor::UNAVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomAttributes {
    pub room_sensor: String,
    pub room_temperature_actual: Option<Temperature>,
}

/// Diagnostic snapshot of what the published value was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowAttributes {
    pub outdoor_temperature: Option<Temperature>,
    pub curve_slope: f32,
    pub curve_level: Temperature,
    pub room_temperature_target: Temperature,
    pub min_flow_temperature: Temperature,
    pub max_flow_temperature: Temperature,
    pub hysteresis: Temperature,
    pub calculation_mode: CalculationMode,
    pub outdoor_sensor: String,
    #[serde(flatten)]
    pub room: Option<RoomAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowUpdate {
    pub installation_id: InstallationId,
    pub name: String,
    pub state: FlowState,
    pub attributes: FlowAttributes,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub trait Publish {
    fn publish(&self, update: &FlowUpdate);
}

/// Writes every update as one line of JSON.
pub struct JsonLinesPublisher<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        JsonLinesPublisher {
            out: RefCell::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Publish for JsonLinesPublisher<W> {
    fn publish(&self, update: &FlowUpdate) {
        let mut out = self.out.borrow_mut();
        let result = serde_json::to_writer(&mut *out, update)
            .map_err(anyhow::Error::from)
            .and_then(|_| {
                writeln!(out)?;
                out.flush()?;
                Ok(())
            });
        if let Err(err) = result {
            error!("Failed to publish {}: {:#}", update.installation_id, err);
        }
    }
}

/// Keeps every update in memory, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingPublisher {
    updates: RefCell<Vec<FlowUpdate>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn updates(&self) -> Vec<FlowUpdate> {
        self.updates.borrow().clone()
    }

    pub fn states(&self) -> Vec<FlowState> {
        self.updates.borrow().iter().map(|update| update.state).collect()
    }

    pub fn last(&self) -> Option<FlowUpdate> {
        self.updates.borrow().last().cloned()
    }
}

#[cfg(test)]
impl Publish for RecordingPublisher {
    fn publish(&self, update: &FlowUpdate) {
        self.updates.borrow_mut().push(update.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(state: FlowState, room: Option<RoomAttributes>) -> FlowUpdate {
        FlowUpdate {
            installation_id: InstallationId::for_outdoor_sensor("sensor.outdoor"),
            name: "Heating Curve".to_string(),
            state,
            attributes: FlowAttributes {
                outdoor_temperature: Some(Temperature::new(-5.0)),
                curve_slope: 1.5,
                curve_level: Temperature::new(0.0),
                room_temperature_target: Temperature::new(20.0),
                min_flow_temperature: Temperature::new(20.0),
                max_flow_temperature: Temperature::new(75.0),
                hysteresis: Temperature::new(1.0),
                calculation_mode: CalculationMode::Classic,
                outdoor_sensor: "sensor.outdoor".to_string(),
                room,
            },
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_unavailable_is_explicit() {
        let value = serde_json::to_value(update(FlowState::Unavailable, None)).unwrap();
        assert_eq!(value["state"], json!("unavailable"));
    }

    #[test]
    fn test_available_is_numeric() {
        let value =
            serde_json::to_value(update(FlowState::Available(Temperature::new(55.0)), None))
                .unwrap();
        assert_eq!(value["state"], json!(55.0));
        assert_eq!(value["updated_at"], json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_room_attributes_only_when_configured() {
        let value = serde_json::to_value(update(FlowState::Unavailable, None)).unwrap();
        assert!(value["attributes"].get("room_sensor").is_none());

        let room = RoomAttributes {
            room_sensor: "sensor.living_room".to_string(),
            room_temperature_actual: None,
        };
        let value = serde_json::to_value(update(FlowState::Unavailable, Some(room))).unwrap();
        assert_eq!(value["attributes"]["room_sensor"], json!("sensor.living_room"));
        assert_eq!(value["attributes"]["room_temperature_actual"], json!(null));
        assert_eq!(value["attributes"]["calculation_mode"], json!("classic"));
    }

    #[test]
    fn test_json_lines_publisher_writes_one_line_per_update() {
        let publisher = JsonLinesPublisher::new(Vec::new());
        publisher.publish(&update(FlowState::Unavailable, None));
        publisher.publish(&update(FlowState::Available(Temperature::new(20.0)), None));

        let output = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["state"], json!(20.0));
    }
}
