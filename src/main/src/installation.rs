use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use control::{ParameterKey, ParameterValue};
use log::*;
use serde::Serialize;

mod setup;

pub use setup::{InstallationRequest, OutdoorStep, DEFAULT_NAME};

use crate::error::{Error, Result};
use crate::flow::FlowTemperatureSensor;
use crate::publish::Publish;
use crate::sensor::SensorBus;
use crate::store::ParameterStore;

/// Identifies an installation. Derived from the outdoor sensor, so one sensor
/// can drive at most one installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InstallationId(String);

impl InstallationId {
    pub fn for_outdoor_sensor(outdoor_sensor: &str) -> InstallationId {
        InstallationId(format!("{}_heating_curve", outdoor_sensor))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
    pub id: InstallationId,
    pub name: String,
    pub outdoor_sensor: String,
    pub room_sensor: Option<String>,
}

/// Changes accepted after creation. The room sensor is replaced as given;
/// parameters are validated together, so their order does not matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub room_sensor: Option<String>,
    pub parameters: Vec<(ParameterKey, ParameterValue)>,
}

/// Every configured installation together with its live flow sensor.
pub struct Installations {
    sensors: Rc<SensorBus>,
    store: Rc<ParameterStore>,
    publisher: Rc<dyn Publish>,
    entries: BTreeMap<InstallationId, FlowTemperatureSensor>,
}

impl Installations {
    pub fn new(
        sensors: Rc<SensorBus>,
        store: Rc<ParameterStore>,
        publisher: Rc<dyn Publish>,
    ) -> Installations {
        Installations {
            sensors,
            store,
            publisher,
            entries: BTreeMap::new(),
        }
    }

    /// Start configuring an installation. Rejects an outdoor sensor that
    /// already drives one.
    pub fn begin(&self, name: &str, outdoor_sensor: &str) -> Result<OutdoorStep> {
        let step = OutdoorStep::new(&self.sensors, name, outdoor_sensor)?;
        self.ensure_new(&step.id())?;
        Ok(step)
    }

    pub fn add(&mut self, request: InstallationRequest) -> Result<InstallationId> {
        let InstallationRequest {
            installation,
            parameters,
        } = request;
        self.ensure_new(&installation.id)?;

        let id = installation.id.clone();
        self.store.seed(&id, parameters)?;
        info!(
            "Configured {} ({}) from {}",
            installation.name, id, installation.outdoor_sensor
        );
        self.entries.insert(id.clone(), self.attach(installation));
        Ok(id)
    }

    /// Apply options and reload the installation. Nothing is changed unless
    /// every option validates.
    pub fn reconfigure(&mut self, id: &InstallationId, options: Options) -> Result<()> {
        let mut installation = self.installation(id)?.clone();

        let room_sensor = options
            .room_sensor
            .map(|entity| entity.trim().to_string())
            .filter(|entity| !entity.is_empty());
        if let Some(entity) = &room_sensor {
            if !self.sensors.contains(entity) {
                return Err(Error::SensorNotFound(entity.clone()));
            }
        }
        self.store
            .parameters(id)
            .set_many(options.parameters.iter().copied())?;

        // Detach before writing so the reload publishes once
        self.entries.remove(id);
        installation.room_sensor = room_sensor;
        let result = self.store.set_many(id, &options.parameters);
        info!("Reloading {}", id);
        self.entries.insert(id.clone(), self.attach(installation));
        result
    }

    pub fn remove(&mut self, id: &InstallationId) -> Result<Installation> {
        let sensor = self
            .entries
            .remove(id)
            .ok_or_else(|| Error::UnknownInstallation(id.clone()))?;
        let installation = sensor.installation().clone();
        drop(sensor);
        self.store.forget(id)?;
        info!("Removed {}", id);
        Ok(installation)
    }

    pub fn installation(&self, id: &InstallationId) -> Result<&Installation> {
        self.sensor(id).map(FlowTemperatureSensor::installation)
    }

    pub fn sensor(&self, id: &InstallationId) -> Result<&FlowTemperatureSensor> {
        self.entries
            .get(id)
            .ok_or_else(|| Error::UnknownInstallation(id.clone()))
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn sensors(&self) -> &SensorBus {
        &self.sensors
    }

    fn ensure_new(&self, id: &InstallationId) -> Result<()> {
        if self.entries.contains_key(id) {
            warn!("{} is already configured", id);
            return Err(Error::DuplicateInstallation(id.clone()));
        }
        Ok(())
    }

    fn attach(&self, installation: Installation) -> FlowTemperatureSensor {
        FlowTemperatureSensor::attach(
            installation,
            self.sensors.clone(),
            self.store.clone(),
            self.publisher.clone(),
        )
    }
}
