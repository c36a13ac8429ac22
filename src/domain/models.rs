//! Domain models shared by the registry, resolver, client and job engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dialect of the automation controller behind an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Awx,
    Aap,
    Tower,
}

impl PlatformType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformType::Awx => "awx",
            PlatformType::Aap => "aap",
            PlatformType::Tower => "tower",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "awx" => Some(PlatformType::Awx),
            "aap" => Some(PlatformType::Aap),
            "tower" => Some(PlatformType::Tower),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered automation-controller target. Carries no secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_platform")]
    pub platform_type: PlatformType,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_platform() -> PlatformType {
    PlatformType::Awx
}

fn default_true() -> bool {
    true
}

impl EnvironmentConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_url: base_url.into(),
            platform_type: PlatformType::Awx,
            verify_ssl: true,
            is_default: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_platform(mut self, platform_type: PlatformType) -> Self {
        self.platform_type = platform_type;
        self
    }
}

/// Kind of secret used to authenticate against the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Token,
    Password,
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOrigin {
    Stored,
    ClientProvided,
    Provider(String),
}

impl fmt::Display for CredentialOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialOrigin::Stored => f.write_str("stored"),
            CredentialOrigin::ClientProvided => f.write_str("client-provided"),
            CredentialOrigin::Provider(name) => write!(f, "provider:{name}"),
        }
    }
}

/// Resolved authentication material. Only the credential resolver
/// constructs these; everything else receives a built client.
#[derive(Clone)]
pub struct CredentialMaterial {
    pub credential_type: CredentialType,
    pub username: Option<String>,
    pub secret: String,
    pub origin: CredentialOrigin,
}

impl CredentialMaterial {
    pub fn token(secret: impl Into<String>, origin: CredentialOrigin) -> Self {
        Self {
            credential_type: CredentialType::Token,
            username: None,
            secret: secret.into(),
            origin,
        }
    }

    pub fn password(
        username: impl Into<String>,
        secret: impl Into<String>,
        origin: CredentialOrigin,
    ) -> Self {
        Self {
            credential_type: CredentialType::Password,
            username: Some(username.into()),
            secret: secret.into(),
            origin,
        }
    }
}

// Secrets must never reach logs, so Debug redacts the value.
impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialMaterial")
            .field("credential_type", &self.credential_type)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("origin", &self.origin)
            .finish()
    }
}

/// Job state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Successful | JobStatus::Failed | JobStatus::Error | JobStatus::Canceled
        )
    }

    /// Ordering used to keep observed transitions monotonic.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Waiting => 1,
            JobStatus::Running => 2,
            JobStatus::Successful
            | JobStatus::Failed
            | JobStatus::Error
            | JobStatus::Canceled => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Successful => "successful",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical ping result, identical across platform dialects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub platform_type: PlatformType,
    pub version: Option<String>,
    pub active_node: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub job_type: String,
    pub inventory: Option<i64>,
    pub project: Option<i64>,
    pub playbook: String,
    #[serde(default)]
    pub extra_vars: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub status: JobStatus,
    pub job_template: Option<i64>,
    pub inventory: Option<i64>,
    pub project: Option<i64>,
    #[serde(default)]
    pub playbook: String,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub elapsed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: i64,
    pub event: String,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub changed: bool,
    pub task: Option<String>,
    pub play: Option<String>,
    pub host_name: Option<String>,
    pub stdout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub organization: Option<i64>,
    #[serde(default)]
    pub total_hosts: i64,
    #[serde(default)]
    pub hosts_with_active_failures: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHost {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub scm_type: Option<String>,
    pub scm_url: Option<String>,
    pub scm_branch: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Record returned when a project SCM update is triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub id: i64,
    pub status: JobStatus,
}

/// Record returned when a workflow launch is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: i64,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_terminal() {
        for status in [
            JobStatus::Successful,
            JobStatus::Failed,
            JobStatus::Error,
            JobStatus::Canceled,
        ] {
            assert!(status.is_terminal());
        }
        for status in [JobStatus::Pending, JobStatus::Waiting, JobStatus::Running] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn credential_debug_redacts_secret() {
        let material = CredentialMaterial::token("super-secret", CredentialOrigin::Stored);
        let debug = format!("{material:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn platform_type_round_trips_through_str() {
        for platform in [PlatformType::Awx, PlatformType::Aap, PlatformType::Tower] {
            assert_eq!(PlatformType::from_str(platform.as_str()), Some(platform));
        }
        assert_eq!(PlatformType::from_str("AAP"), Some(PlatformType::Aap));
        assert_eq!(PlatformType::from_str("rundeck"), None);
    }
}
