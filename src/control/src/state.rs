use core::fmt;

use serde::{Deserialize, Serialize};

// Temperature in degrees celcius
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f32);

impl Temperature {
    pub fn new(value: f32) -> Self {
        Self(value)
    }
}

impl From<Temperature> for f32 {
    fn from(value: Temperature) -> f32 {
        value.0
    }
}

impl From<f32> for Temperature {
    fn from(value: f32) -> Temperature {
        Temperature(value)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

// Which room temperature the heating curve is referenced against
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    // Target room temperature only
    #[default]
    Classic,
    // Measured room temperature when a reading is available
    WithRoomTemp,
}

impl CalculationMode {
    pub const ALL: [CalculationMode; 2] = [CalculationMode::Classic, CalculationMode::WithRoomTemp];

    pub fn as_str(self) -> &'static str {
        match self {
            CalculationMode::Classic => "classic",
            CalculationMode::WithRoomTemp => "with_room_temp",
        }
    }

    pub fn requires_room_temperature(self) -> bool {
        matches!(self, CalculationMode::WithRoomTemp)
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for CalculationMode {
    type Err = crate::ParameterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CalculationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or(crate::ParameterError::UnknownMode)
    }
}
