//! Error taxonomy shared across the crate.

use crate::domain::models::JobStatus;
use thiserror::Error;

/// Every failure a tool invocation can surface.
#[derive(Debug, Error)]
pub enum AwxError {
    #[error("configuration error for environment '{environment}': {reason}")]
    Configuration { environment: String, reason: String },

    #[error("an environment named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("authentication failed against environment '{environment}'")]
    Authentication { environment: String },

    #[error("permission denied on environment '{environment}': {reason}")]
    Authorization { environment: String, reason: String },

    #[error("transient network failure: {reason}")]
    TransientNetwork { reason: String },

    #[error("unexpected platform response: {reason}")]
    Protocol { reason: String },

    #[error("secret provider '{provider}' does not implement this integration")]
    UnsupportedOperation { provider: String },

    #[error("timed out waiting for job {job_id}; last observed state was '{last_state}'")]
    Timeout { job_id: i64, last_state: JobStatus },
}

impl AwxError {
    pub fn configuration(environment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            environment: environment.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn authentication(environment: impl Into<String>) -> Self {
        Self::Authentication {
            environment: environment.into(),
        }
    }

    pub fn authorization(environment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authorization {
            environment: environment.into(),
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientNetwork {
            reason: reason.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    pub fn unsupported(provider: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            provider: provider.into(),
        }
    }

    /// Only transient network failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AwxError::TransientNetwork { .. })
    }

    /// Stable kind tag used by the tool boundary's structured failures.
    pub fn kind(&self) -> &'static str {
        match self {
            AwxError::Configuration { .. } => "configuration_error",
            AwxError::DuplicateName { .. } => "duplicate_name_error",
            AwxError::NotFound { .. } => "not_found_error",
            AwxError::Authentication { .. } => "authentication_error",
            AwxError::Authorization { .. } => "authorization_error",
            AwxError::TransientNetwork { .. } => "transient_network_error",
            AwxError::Protocol { .. } => "protocol_error",
            AwxError::UnsupportedOperation { .. } => "unsupported_operation_error",
            AwxError::Timeout { .. } => "timeout_error",
        }
    }

    /// Actionable message for the invoking client.
    pub fn user_message(&self) -> String {
        match self {
            AwxError::Authentication { environment } => format!(
                "Authentication failed against environment '{environment}'. \
                 Refresh or re-store the credential for this environment."
            ),
            AwxError::Authorization { environment, .. } => format!(
                "The stored credential lacks permission on environment '{environment}'. \
                 Check its scope or refresh it."
            ),
            AwxError::Configuration {
                environment,
                reason,
            } => format!("Environment '{environment}' is not usable: {reason}"),
            AwxError::Timeout { job_id, last_state } => format!(
                "Job {job_id} did not reach a terminal state before the deadline; \
                 it was last seen '{last_state}' and is still running on the platform."
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AwxError::transient("connection reset").is_retryable());
        assert!(!AwxError::not_found("job 9").is_retryable());
        assert!(!AwxError::authentication("prod").is_retryable());
        assert!(!AwxError::protocol("bad body").is_retryable());
    }

    #[test]
    fn auth_message_names_environment_and_suggests_refresh() {
        let message = AwxError::authentication("prod").user_message();
        assert!(message.contains("prod"));
        assert!(message.to_lowercase().contains("refresh"));
    }

    #[test]
    fn timeout_message_reports_last_state() {
        let error = AwxError::Timeout {
            job_id: 42,
            last_state: JobStatus::Running,
        };
        assert!(error.user_message().contains("running"));
    }
}
