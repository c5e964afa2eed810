use control::ParameterSet;

use crate::error::{Error, Result};
use crate::sensor::SensorBus;

use super::{Installation, InstallationId};

pub const DEFAULT_NAME: &str = "Heating Curve";

fn require_known(sensors: &SensorBus, entity: &str) -> Result<()> {
    if sensors.contains(entity) {
        Ok(())
    } else {
        Err(Error::SensorNotFound(entity.to_string()))
    }
}

/// First step of configuring an installation: name and outdoor sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct OutdoorStep {
    name: String,
    outdoor_sensor: String,
}

impl OutdoorStep {
    pub fn new(sensors: &SensorBus, name: &str, outdoor_sensor: &str) -> Result<OutdoorStep> {
        let outdoor_sensor = outdoor_sensor.trim();
        if outdoor_sensor.is_empty() {
            return Err(Error::SensorRequired);
        }
        require_known(sensors, outdoor_sensor)?;

        let name = match name.trim() {
            "" => DEFAULT_NAME,
            name => name,
        };
        Ok(OutdoorStep {
            name: name.to_string(),
            outdoor_sensor: outdoor_sensor.to_string(),
        })
    }

    pub fn id(&self) -> InstallationId {
        InstallationId::for_outdoor_sensor(&self.outdoor_sensor)
    }

    /// Second step: the optional room sensor. An empty reference means none.
    pub fn room_sensor(
        self,
        sensors: &SensorBus,
        room_sensor: Option<&str>,
    ) -> Result<InstallationRequest> {
        let room_sensor = room_sensor
            .map(str::trim)
            .filter(|entity| !entity.is_empty());
        if let Some(entity) = room_sensor {
            require_known(sensors, entity)?;
        }

        Ok(InstallationRequest {
            installation: Installation {
                id: self.id(),
                name: self.name,
                outdoor_sensor: self.outdoor_sensor,
                room_sensor: room_sensor.map(str::to_string),
            },
            parameters: ParameterSet::default(),
        })
    }
}

/// A fully validated installation, ready to be added.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationRequest {
    pub installation: Installation,
    // Used unless the settings backend already has values for this id
    pub parameters: ParameterSet,
}

impl InstallationRequest {
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }
}
