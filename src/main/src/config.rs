use std::path::PathBuf;

use control::{CalculationMode, ParameterKey, ParameterSet, ParameterValue};
use log::*;

#[toml_cfg::toml_config]
pub struct TomlConfig {
    #[default("Heating Curve")]
    name: &'static str,
    #[default("sensor.outdoor_temperature")]
    outdoor_sensor: &'static str,
    #[default("")]
    room_sensor: &'static str,
    #[default("")]
    settings_path: &'static str,
    #[default(1.4)]
    curve_slope: f32,
    #[default(0.0)]
    curve_level: f32,
    #[default(20.0)]
    room_temp_target: f32,
    #[default(20.0)]
    min_flow_temp: f32,
    #[default(75.0)]
    max_flow_temp: f32,
    #[default(1.0)]
    hysteresis: f32,
    #[default("classic")]
    calculation_mode: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub name: String,
    pub outdoor_sensor: String,
    pub room_sensor: Option<String>,
    // In-memory settings when unset
    pub settings_path: Option<PathBuf>,
    pub parameters: ParameterSet,
}

impl Config {
    pub fn read() -> Self {
        Config::from(TOML_CONFIG)
    }

    /// Every sensor entity the installation reads from.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.outdoor_sensor.as_str()).chain(self.room_sensor.as_deref())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

impl From<TomlConfig> for Config {
    fn from(config: TomlConfig) -> Self {
        let mode = config.calculation_mode.parse::<CalculationMode>().unwrap_or_else(|err| {
            warn!("Configured calculation_mode {:?}: {}", config.calculation_mode, err);
            CalculationMode::default()
        });
        let values = [
            (ParameterKey::CurveSlope, ParameterValue::from(config.curve_slope)),
            (ParameterKey::CurveLevel, ParameterValue::from(config.curve_level)),
            (ParameterKey::RoomTempTarget, ParameterValue::from(config.room_temp_target)),
            (ParameterKey::MaxFlowTemp, ParameterValue::from(config.max_flow_temp)),
            (ParameterKey::MinFlowTemp, ParameterValue::from(config.min_flow_temp)),
            (ParameterKey::Hysteresis, ParameterValue::from(config.hysteresis)),
            (ParameterKey::CalculationMode, ParameterValue::Mode(mode)),
        ];

        let mut parameters = ParameterSet::default();
        for (key, value) in values {
            if let Err(err) = parameters.set(key, value) {
                warn!("Configured {}: {}, using {}", key, err, parameters.get(key));
            }
        }

        Config {
            name: config.name.to_string(),
            outdoor_sensor: config.outdoor_sensor.to_string(),
            room_sensor: non_empty(config.room_sensor).map(str::to_string),
            settings_path: non_empty(config.settings_path).map(PathBuf::from),
            parameters,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: crate::installation::DEFAULT_NAME.to_string(),
            outdoor_sensor: "sensor.outdoor_temperature".to_string(),
            room_sensor: None,
            settings_path: None,
            parameters: ParameterSet::default(),
        }
    }
}
