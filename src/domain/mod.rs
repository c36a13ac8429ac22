//! Core domain model: environments, credentials, jobs and the shared
//! error taxonomy.

mod error;
mod models;

pub use error::AwxError;
pub use models::{
    CredentialMaterial, CredentialOrigin, CredentialType, EnvironmentConfig, Inventory,
    InventoryHost, Job, JobEvent, JobStatus, JobTemplate, Organization, PlatformInfo,
    PlatformType, Project, ProjectUpdate, WorkflowJob, WorkflowTemplate,
};
