use control::{ParameterKey, ParameterValue};

use crate::installation::InstallationId;

/// Emitted after a parameter write has been validated, persisted and applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChanged {
    pub installation_id: InstallationId,
    pub key: ParameterKey,
    pub value: ParameterValue,
}
