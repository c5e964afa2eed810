use std::io::BufRead;
use std::rc::Rc;

use anyhow::Result;
use control::{CalculationMode, ParameterKey, ParameterSet};
use log::*;

use heating_curve::config::Config;
use heating_curve::installation::{InstallationId, Installations};
use heating_curve::publish::{JsonLinesPublisher, Publish};
use heating_curve::sensor::{self, SensorBus};
use heating_curve::store::{JsonFileBackend, MemoryBackend, ParameterStore, SettingsBackend};

mod command;

use command::Command;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::read();
    info!("Starting with {:?}", config);

    let backend: Box<dyn SettingsBackend> = match &config.settings_path {
        Some(path) => Box::new(JsonFileBackend::open(path)?),
        None => Box::<MemoryBackend>::default(),
    };
    let store = Rc::new(ParameterStore::new(backend));
    let sensors = Rc::new(SensorBus::default());
    let publisher: Rc<dyn Publish> = Rc::new(JsonLinesPublisher::new(std::io::stdout()));

    // The host knows its sensors before any reading has arrived
    for entity in config.sensors() {
        if !sensors.contains(entity) {
            sensors.set_state(entity, sensor::UNKNOWN);
        }
    }

    let mut installations = Installations::new(sensors.clone(), store, publisher);
    let request = installations
        .begin(&config.name, &config.outdoor_sensor)?
        .room_sensor(&sensors, config.room_sensor.as_deref())?
        .with_parameters(config.parameters);
    let mut current = Some(installations.add(request)?);

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = run(command, &mut installations, &mut current) {
                    warn!("{:#}", err);
                }
            }
            Err(err) => warn!("{:#}", err),
        }
    }

    info!("Shutting down");
    Ok(())
}

fn run(
    command: Command,
    installations: &mut Installations,
    current: &mut Option<InstallationId>,
) -> Result<()> {
    match command {
        Command::State { entity, state } => installations.sensors().set_state(&entity, state),
        Command::Clear { entity } => installations.sensors().remove_state(&entity),
        Command::Set { key, value } => {
            let id = selected(current)?;
            installations.store().set(id, key, value)?;
        }
        Command::Show => {
            let id = selected(current)?;
            show_parameters(&installations.store().parameters(id));
            installations.sensor(id)?.refresh();
        }
        Command::Remove => {
            let id = selected(current)?.clone();
            let installation = installations.remove(&id)?;
            info!("{} removed", installation.name);
            *current = None;
        }
        Command::Quit => {}
    }
    Ok(())
}

fn show_parameters(parameters: &ParameterSet) {
    for key in ParameterKey::ALL {
        let value = parameters.get(key);
        match key.descriptor() {
            Some(descriptor) => info!(
                "{} = {}{} ({} to {}, step {})",
                key,
                value,
                descriptor.unit.unwrap_or(""),
                descriptor.min,
                descriptor.max,
                descriptor.step
            ),
            None => {
                let modes: Vec<_> = CalculationMode::ALL.iter().map(|mode| mode.as_str()).collect();
                info!("{} = {} (one of {})", key, value, modes.join(", "));
            }
        }
    }
}

fn selected(current: &Option<InstallationId>) -> Result<&InstallationId> {
    current
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No installation is configured"))
}
