use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CalculationMode, ParameterError};

/// The tunable settings of one installation, addressed individually.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    CurveSlope,
    CurveLevel,
    RoomTempTarget,
    MinFlowTemp,
    MaxFlowTemp,
    Hysteresis,
    CalculationMode,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 7] = [
        ParameterKey::CurveSlope,
        ParameterKey::CurveLevel,
        ParameterKey::RoomTempTarget,
        ParameterKey::MinFlowTemp,
        ParameterKey::MaxFlowTemp,
        ParameterKey::Hysteresis,
        ParameterKey::CalculationMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKey::CurveSlope => "curve_slope",
            ParameterKey::CurveLevel => "curve_level",
            ParameterKey::RoomTempTarget => "room_temp_target",
            ParameterKey::MinFlowTemp => "min_flow_temp",
            ParameterKey::MaxFlowTemp => "max_flow_temp",
            ParameterKey::Hysteresis => "hysteresis",
            ParameterKey::CalculationMode => "calculation_mode",
        }
    }

    /// Range, step and default of a numeric parameter. `None` for the mode.
    pub fn descriptor(self) -> Option<&'static ParameterDescriptor> {
        match self {
            ParameterKey::CurveSlope => Some(&CURVE_SLOPE),
            ParameterKey::CurveLevel => Some(&CURVE_LEVEL),
            ParameterKey::RoomTempTarget => Some(&ROOM_TEMP_TARGET),
            ParameterKey::MinFlowTemp => Some(&MIN_FLOW_TEMP),
            ParameterKey::MaxFlowTemp => Some(&MAX_FLOW_TEMP),
            ParameterKey::Hysteresis => Some(&HYSTERESIS),
            ParameterKey::CalculationMode => None,
        }
    }

    /// Type and range check of a value for this key, ignoring other fields.
    pub fn check(self, value: ParameterValue) -> Result<ParameterValue, ParameterError> {
        match (self.descriptor(), value) {
            (None, ParameterValue::Mode(_)) => Ok(value),
            (Some(descriptor), ParameterValue::Number(number)) => {
                descriptor.check(self, number).map(ParameterValue::Number)
            }
            _ => Err(ParameterError::TypeMismatch { key: self }),
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKey {
    type Err = ParameterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ParameterKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or(ParameterError::UnknownKey)
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f32),
    Mode(CalculationMode),
}

impl ParameterValue {
    /// Interpret a textual value for `key`, as typed into a control.
    pub fn parse(key: ParameterKey, value: &str) -> Result<ParameterValue, ParameterError> {
        match key {
            ParameterKey::CalculationMode => value.parse().map(ParameterValue::Mode),
            _ => value
                .trim()
                .parse::<f32>()
                .map(ParameterValue::Number)
                .map_err(|_| ParameterError::TypeMismatch { key }),
        }
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<CalculationMode> for ParameterValue {
    fn from(mode: CalculationMode) -> Self {
        ParameterValue::Mode(mode)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(value) => write!(f, "{}", value),
            ParameterValue::Mode(mode) => write!(f, "{}", mode),
        }
    }
}

// Declared bounds of a numeric parameter. The step is a hint for sliders and
// is not enforced on writes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ParameterDescriptor {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub unit: Option<&'static str>,
    pub default: f32,
}

impl ParameterDescriptor {
    pub fn check(&self, key: ParameterKey, value: f32) -> Result<f32, ParameterError> {
        if (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(ParameterError::OutOfRange {
                key,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

const CELSIUS: Option<&str> = Some("°C");

pub static CURVE_SLOPE: ParameterDescriptor = ParameterDescriptor {
    min: 0.1,
    max: 5.0,
    step: 0.1,
    unit: None,
    default: 1.4,
};

pub static CURVE_LEVEL: ParameterDescriptor = ParameterDescriptor {
    min: -20.0,
    max: 20.0,
    step: 0.5,
    unit: CELSIUS,
    default: 0.0,
};

pub static ROOM_TEMP_TARGET: ParameterDescriptor = ParameterDescriptor {
    min: 15.0,
    max: 25.0,
    step: 0.5,
    unit: CELSIUS,
    default: 20.0,
};

pub static MIN_FLOW_TEMP: ParameterDescriptor = ParameterDescriptor {
    min: 15.0,
    max: 50.0,
    step: 1.0,
    unit: CELSIUS,
    default: 20.0,
};

pub static MAX_FLOW_TEMP: ParameterDescriptor = ParameterDescriptor {
    min: 40.0,
    max: 90.0,
    step: 1.0,
    unit: CELSIUS,
    default: 75.0,
};

// Accepted and stored, but not used by the heating curve.
pub static HYSTERESIS: ParameterDescriptor = ParameterDescriptor {
    min: 0.0,
    max: 5.0,
    step: 0.1,
    unit: CELSIUS,
    default: 1.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trips_through_its_name() {
        for key in ParameterKey::ALL {
            assert_eq!(key.as_str().parse::<ParameterKey>(), Ok(key));
        }
        assert_eq!(
            "flow_boost".parse::<ParameterKey>(),
            Err(ParameterError::UnknownKey)
        );
    }

    #[test]
    fn test_only_the_mode_has_no_descriptor() {
        for key in ParameterKey::ALL {
            assert_eq!(key.descriptor().is_none(), key == ParameterKey::CalculationMode);
        }
    }

    #[test]
    fn test_defaults_lie_within_their_ranges() {
        for descriptor in ParameterKey::ALL.iter().filter_map(|key| key.descriptor()) {
            assert!(descriptor.min <= descriptor.default && descriptor.default <= descriptor.max, "{:?}", descriptor);
        }
    }

    #[test]
    fn test_check_accepts_inclusive_bounds() {
        assert_eq!(CURVE_SLOPE.check(ParameterKey::CurveSlope, 0.1), Ok(0.1));
        assert_eq!(CURVE_SLOPE.check(ParameterKey::CurveSlope, 5.0), Ok(5.0));
        assert_eq!(
            CURVE_SLOPE.check(ParameterKey::CurveSlope, 5.1),
            Err(ParameterError::OutOfRange {
                key: ParameterKey::CurveSlope,
                value: 5.1,
                min: 0.1,
                max: 5.0,
            })
        );
        assert!(CURVE_SLOPE.check(ParameterKey::CurveSlope, f32::NAN).is_err());
    }

    #[test]
    fn test_key_check_ignores_other_fields() {
        assert_eq!(
            ParameterKey::MinFlowTemp.check(ParameterValue::Number(50.0)),
            Ok(ParameterValue::Number(50.0))
        );
        assert!(ParameterKey::MinFlowTemp
            .check(ParameterValue::Number(51.0))
            .is_err());
        assert_eq!(
            ParameterKey::CalculationMode.check(ParameterValue::Number(1.0)),
            Err(ParameterError::TypeMismatch {
                key: ParameterKey::CalculationMode
            })
        );
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            ParameterValue::parse(ParameterKey::CurveLevel, " -2.5"),
            Ok(ParameterValue::Number(-2.5))
        );
        assert_eq!(
            ParameterValue::parse(ParameterKey::CalculationMode, "with_room_temp"),
            Ok(ParameterValue::Mode(CalculationMode::WithRoomTemp))
        );
        assert_eq!(
            ParameterValue::parse(ParameterKey::CalculationMode, "eco"),
            Err(ParameterError::UnknownMode)
        );
        assert_eq!(
            ParameterValue::parse(ParameterKey::CurveSlope, "steep"),
            Err(ParameterError::TypeMismatch {
                key: ParameterKey::CurveSlope
            })
        );
    }
}
