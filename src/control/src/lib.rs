#![cfg_attr(not(test), no_std)]

mod config;
mod error;
mod parameter;
mod state;

pub use config::ParameterSet;
pub use error::ParameterError;
pub use parameter::{ParameterKey, ParameterDescriptor, ParameterValue};
pub use state::{CalculationMode, Temperature};

/// The room temperature the curve is evaluated against.
///
/// The measured room temperature is only used in [`CalculationMode::WithRoomTemp`]
/// and only while a reading is present; otherwise this falls back to the target.
pub fn reference_temperature(
    room_temperature: Option<Temperature>,
    params: &ParameterSet,
) -> Temperature {
    match (params.calculation_mode, room_temperature) {
        (CalculationMode::WithRoomTemp, Some(room_temperature)) => room_temperature,
        _ => params.room_temp_target,
    }
}

/// Unclamped, unrounded flow temperature of the heating curve.
pub fn heating_curve(
    outdoor_temperature: Temperature,
    room_temperature: Option<Temperature>,
    params: &ParameterSet,
) -> f32 {
    let reference = f32::from(reference_temperature(room_temperature, params));
    let temperature_difference = reference - f32::from(outdoor_temperature);

    f32::from(params.room_temp_target)
        + params.curve_slope * temperature_difference
        + f32::from(params.curve_level)
}

/// Flow temperature for the given readings, limited to the configured flow
/// bounds and rounded to one decimal place (ties away from zero).
pub fn compute_flow_temperature(
    outdoor_temperature: Temperature,
    room_temperature: Option<Temperature>,
    params: &ParameterSet,
) -> Temperature {
    let flow_temperature = heating_curve(outdoor_temperature, room_temperature, params);

    // Lower bound wins should the bounds ever be inverted
    let clamped = flow_temperature
        .min(f32::from(params.max_flow_temp))
        .max(f32::from(params.min_flow_temp));

    Temperature::new(round_to_tenth(clamped))
}

fn round_to_tenth(value: f32) -> f32 {
    micromath::F32Ext::round(value * 10.0) / 10.0
}
