use crate::parameter::{
    CURVE_LEVEL, CURVE_SLOPE, HYSTERESIS, MAX_FLOW_TEMP, MIN_FLOW_TEMP, ROOM_TEMP_TARGET,
};
use crate::{CalculationMode, ParameterError, ParameterKey, ParameterValue, Temperature};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParameterSet {
    // Steepness of the heating curve
    pub curve_slope: f32,

    // Parallel shift of the whole curve
    pub curve_level: Temperature,

    // Desired room temperature, the curve's reference point
    pub room_temp_target: Temperature,

    // Lower limit of the supplied flow temperature
    pub min_flow_temp: Temperature,

    // Upper limit of the supplied flow temperature
    pub max_flow_temp: Temperature,

    // Stored for the control surface, not used by the calculation
    pub hysteresis: Temperature,

    pub calculation_mode: CalculationMode,
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            curve_slope: CURVE_SLOPE.default,
            curve_level: Temperature::new(CURVE_LEVEL.default),
            room_temp_target: Temperature::new(ROOM_TEMP_TARGET.default),
            min_flow_temp: Temperature::new(MIN_FLOW_TEMP.default),
            max_flow_temp: Temperature::new(MAX_FLOW_TEMP.default),
            hysteresis: Temperature::new(HYSTERESIS.default),
            calculation_mode: CalculationMode::default(),
        }
    }
}

impl ParameterSet {
    pub fn get(&self, key: ParameterKey) -> ParameterValue {
        match key {
            ParameterKey::CurveSlope => ParameterValue::Number(self.curve_slope),
            ParameterKey::CurveLevel => self.curve_level.into(),
            ParameterKey::RoomTempTarget => self.room_temp_target.into(),
            ParameterKey::MinFlowTemp => self.min_flow_temp.into(),
            ParameterKey::MaxFlowTemp => self.max_flow_temp.into(),
            ParameterKey::Hysteresis => self.hysteresis.into(),
            ParameterKey::CalculationMode => ParameterValue::Mode(self.calculation_mode),
        }
    }

    /// Validate and apply a single field. On error `self` is left untouched.
    pub fn set(&mut self, key: ParameterKey, value: ParameterValue) -> Result<(), ParameterError> {
        self.set_many([(key, value)])
    }

    /// Apply several fields at once. Every value is range checked, the flow
    /// bounds only on the combined result, so the order of `values` does not
    /// matter. All or nothing.
    pub fn set_many(
        &mut self,
        values: impl IntoIterator<Item = (ParameterKey, ParameterValue)>,
    ) -> Result<(), ParameterError> {
        let mut next = *self;
        for (key, value) in values {
            next.assign(key, value)?;
        }
        next.validate_flow_bounds()?;
        *self = next;
        Ok(())
    }

    fn assign(&mut self, key: ParameterKey, value: ParameterValue) -> Result<(), ParameterError> {
        match key.check(value)? {
            ParameterValue::Mode(mode) => self.calculation_mode = mode,
            ParameterValue::Number(number) => {
                let temperature = Temperature::new(number);
                match key {
                    ParameterKey::CurveSlope => self.curve_slope = number,
                    ParameterKey::CurveLevel => self.curve_level = temperature,
                    ParameterKey::RoomTempTarget => self.room_temp_target = temperature,
                    ParameterKey::MinFlowTemp => self.min_flow_temp = temperature,
                    ParameterKey::MaxFlowTemp => self.max_flow_temp = temperature,
                    ParameterKey::Hysteresis => self.hysteresis = temperature,
                    ParameterKey::CalculationMode => return Err(ParameterError::TypeMismatch { key }),
                }
            }
        }
        Ok(())
    }

    /// Builder-style [`ParameterSet::set`].
    pub fn with(
        mut self,
        key: ParameterKey,
        value: impl Into<ParameterValue>,
    ) -> Result<Self, ParameterError> {
        self.set(key, value.into())?;
        Ok(self)
    }

    fn validate_flow_bounds(&self) -> Result<(), ParameterError> {
        if self.min_flow_temp > self.max_flow_temp {
            return Err(ParameterError::InvertedFlowBounds {
                min_flow: self.min_flow_temp.into(),
                max_flow: self.max_flow_temp.into(),
            });
        }
        Ok(())
    }
}

impl From<Temperature> for ParameterValue {
    fn from(value: Temperature) -> Self {
        ParameterValue::Number(value.into())
    }
}
