use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use control::{ParameterKey, ParameterValue};
use log::*;

use crate::installation::InstallationId;

/// Durable `(installation, key) -> value` mapping behind the parameter store.
pub trait SettingsBackend {
    fn read(&self, id: &InstallationId) -> Result<Vec<(ParameterKey, ParameterValue)>>;

    fn write(&mut self, id: &InstallationId, key: ParameterKey, value: ParameterValue)
        -> Result<()>;

    fn remove(&mut self, id: &InstallationId) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: HashMap<InstallationId, BTreeMap<ParameterKey, ParameterValue>>,
}

impl SettingsBackend for MemoryBackend {
    fn read(&self, id: &InstallationId) -> Result<Vec<(ParameterKey, ParameterValue)>> {
        let values: Vec<_> = self
            .values
            .get(id)
            .map(|values| values.iter().map(|(key, value)| (*key, *value)).collect())
            .unwrap_or_default();
        Ok(values)
    }

    fn write(
        &mut self,
        id: &InstallationId,
        key: ParameterKey,
        value: ParameterValue,
    ) -> Result<()> {
        self.values.entry(id.clone()).or_default().insert(key, value);
        Ok(())
    }

    fn remove(&mut self, id: &InstallationId) -> Result<()> {
        self.values.remove(id);
        Ok(())
    }
}

// installation id -> parameter name -> value
type Document = BTreeMap<String, BTreeMap<String, ParameterValue>>;

/// Keeps every installation's parameters in one JSON document, rewritten on
/// each change.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    document: Document,
}

impl JsonFileBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<JsonFileBackend> {
        let path = path.as_ref().to_path_buf();
        let document = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            info!("No settings at {}, starting empty", path.display());
            Document::default()
        };
        Ok(JsonFileBackend { path, document })
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.document)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

impl SettingsBackend for JsonFileBackend {
    fn read(&self, id: &InstallationId) -> Result<Vec<(ParameterKey, ParameterValue)>> {
        let Some(values) = self.document.get(id.as_str()) else {
            return Ok(Vec::new());
        };
        let values: Vec<_> = values
            .iter()
            .filter_map(|(name, value)| match name.parse::<ParameterKey>() {
                Ok(key) => Some((key, *value)),
                Err(_) => {
                    warn!("Ignoring unknown setting {} of {}", name, id);
                    None
                }
            })
            .collect();
        Ok(values)
    }

    fn write(
        &mut self,
        id: &InstallationId,
        key: ParameterKey,
        value: ParameterValue,
    ) -> Result<()> {
        let previous = self
            .document
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save().inspect_err(|_| {
            // Keep memory in step with what is on disk
            let values = self.document.entry(id.to_string()).or_default();
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key.as_str()),
            };
        })
    }

    fn remove(&mut self, id: &InstallationId) -> Result<()> {
        if self.document.remove(id.as_str()).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
