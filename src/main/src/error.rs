use control::ParameterError;
use thiserror::Error;

use crate::installation::InstallationId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("installation {0} is already configured")]
    DuplicateInstallation(InstallationId),

    #[error("an outdoor sensor is required")]
    SensorRequired,

    #[error("sensor {0} not found")]
    SensorNotFound(String),

    #[error("no installation with id {0}")]
    UnknownInstallation(InstallationId),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
