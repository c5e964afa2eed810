use thiserror::Error;

use crate::ParameterKey;

/// Reasons a parameter write is refused. The previous value is always kept.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ParameterError {
    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: ParameterKey,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("minimum flow temperature {min_flow} would exceed maximum flow temperature {max_flow}")]
    InvertedFlowBounds { min_flow: f32, max_flow: f32 },

    #[error("{key} does not accept a value of this type")]
    TypeMismatch { key: ParameterKey },

    #[error("unknown parameter")]
    UnknownKey,

    #[error("unknown calculation mode")]
    UnknownMode,
}
