//! Durable registry of named environments.
//!
//! Environments are kept in insertion order and rewritten to a JSON
//! document on every mutation, so a crash never loses a committed write.

use crate::domain::{AwxError, EnvironmentConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_STATE_PATH: &str = "~/.awx-mcp/environments.json";

/// On-disk shape of the registry state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryState {
    #[serde(default)]
    environments: Vec<EnvironmentConfig>,
}

pub struct EnvironmentRegistry {
    path: PathBuf,
    environments: Vec<EnvironmentConfig>,
}

impl EnvironmentRegistry {
    /// Open the registry at the default state path, expanding `~`.
    pub fn open_default() -> Result<Self, AwxError> {
        let expanded = shellexpand::tilde(DEFAULT_STATE_PATH).into_owned();
        Self::open(Path::new(&expanded))
    }

    /// Open the registry backed by `path`, loading existing state.
    pub fn open(path: &Path) -> Result<Self, AwxError> {
        let environments = match fs::read_to_string(path) {
            Ok(content) => {
                let state: RegistryState = serde_json::from_str(&content)
                    .map_err(|e| AwxError::protocol(format!("corrupt registry state: {e}")))?;
                state.environments
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(AwxError::protocol(format!(
                    "failed to read registry state from {}: {e}",
                    path.display()
                )));
            }
        };

        debug!(
            path = %path.display(),
            count = environments.len(),
            "Loaded environment registry"
        );
        Ok(Self {
            path: path.to_path_buf(),
            environments,
        })
    }

    /// Register a new environment. The first registered environment
    /// becomes the default automatically.
    pub fn add(&mut self, mut config: EnvironmentConfig) -> Result<(), AwxError> {
        if self.environments.iter().any(|e| e.name == config.name) {
            return Err(AwxError::duplicate_name(&config.name));
        }

        if self.environments.is_empty() {
            config.is_default = true;
        } else if config.is_default {
            self.clear_default();
        }

        self.environments.push(config);
        self.persist()
    }

    /// Replace the record with the same id wholesale.
    pub fn update(&mut self, id: Uuid, config: EnvironmentConfig) -> Result<(), AwxError> {
        if self
            .environments
            .iter()
            .any(|e| e.id != id && e.name == config.name)
        {
            return Err(AwxError::duplicate_name(&config.name));
        }

        let position = self
            .environments
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AwxError::not_found(format!("environment {id}")))?;

        if config.is_default {
            self.clear_default();
        }
        self.environments[position] = EnvironmentConfig { id, ..config };
        self.persist()
    }

    pub fn remove(&mut self, id: Uuid) -> Result<(), AwxError> {
        let position = self
            .environments
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AwxError::not_found(format!("environment {id}")))?;

        let removed = self.environments.remove(position);
        if removed.is_default {
            if let Some(first) = self.environments.first_mut() {
                first.is_default = true;
            }
        }
        self.persist()
    }

    /// Mark `id` as the default, atomically clearing the previous one.
    pub fn set_default(&mut self, id: Uuid) -> Result<(), AwxError> {
        if !self.environments.iter().any(|e| e.id == id) {
            return Err(AwxError::not_found(format!("environment {id}")));
        }
        for env in &mut self.environments {
            env.is_default = env.id == id;
        }
        self.persist()
    }

    pub fn get(&self, id: Uuid) -> Result<&EnvironmentConfig, AwxError> {
        self.environments
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AwxError::not_found(format!("environment {id}")))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&EnvironmentConfig, AwxError> {
        self.environments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| AwxError::not_found(format!("environment '{name}'")))
    }

    pub fn default_environment(&self) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|e| e.is_default)
    }

    /// Environments in the order they were registered.
    pub fn list(&self) -> &[EnvironmentConfig] {
        &self.environments
    }

    fn clear_default(&mut self) {
        for env in &mut self.environments {
            env.is_default = false;
        }
    }

    // Write to a sibling temp file and rename it over the state file so
    // an interrupted write cannot truncate committed state.
    fn persist(&self) -> Result<(), AwxError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AwxError::protocol(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let state = RegistryState {
            environments: self.environments.clone(),
        };
        let content = serde_json::to_string_pretty(&state)
            .map_err(|e| AwxError::protocol(format!("failed to encode registry state: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| AwxError::protocol(format!("failed to write {}: {e}", tmp.display())))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), %e, "Registry rename failed");
            return Err(AwxError::protocol(format!(
                "failed to replace {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}
