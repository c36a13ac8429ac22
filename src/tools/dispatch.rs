//! Typed dispatch for tool invocations.
//!
//! The dispatcher is the protocol boundary: every `AwxError` is caught
//! here and converted into a structured failure result instead of
//! crossing the wire as an unhandled fault.

use crate::app::AppContext;
use crate::client::SystemInfoSection;
use crate::credentials::{CredentialOverride, StoredCredential};
use crate::domain::{AwxError, CredentialType, EnvironmentConfig, PlatformType};
use crate::jobs::JobHandle;
use crate::session::SessionContext;
use crate::tools::catalog;
use futures::TryStreamExt;
use serde::Deserialize;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// One tool invocation as received from a client.
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    /// Environment to run against; the default environment when absent.
    #[serde(default)]
    pub environment: Option<String>,
    /// Session-scoped credential, remote mode only. Never persisted.
    #[serde(default)]
    pub credential_override: Option<CredentialOverride>,
    /// Reuse a previously created session instead of opening one.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse {
    Ok { result: Value },
    Error { error: ToolFailure },
}

#[derive(Debug, Serialize)]
pub struct ToolFailure {
    pub kind: &'static str,
    pub message: String,
}

impl ToolResponse {
    pub fn ok(result: Value) -> Self {
        Self::Ok { result }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Error {
            error: ToolFailure {
                kind: "invalid_arguments",
                message: message.into(),
            },
        }
    }

    fn from_error(error: AwxError) -> Self {
        Self::Error {
            error: ToolFailure {
                kind: error.kind(),
                message: error.user_message(),
            },
        }
    }
}

// ---- argument contracts ----------------------------------------------

#[derive(Deserialize)]
struct EnvAddArgs {
    name: String,
    base_url: String,
    #[serde(default)]
    platform_type: Option<String>,
    #[serde(default = "default_true")]
    verify_ssl: bool,
    #[serde(default)]
    is_default: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct EnvUpdateArgs {
    id: Uuid,
    #[serde(flatten)]
    record: EnvAddArgs,
}

#[derive(Deserialize)]
struct EnvNameArgs {
    name: String,
}

#[derive(Deserialize)]
struct CredentialStoreArgs {
    environment: String,
    credential_type: CredentialType,
    #[serde(default)]
    username: Option<String>,
    secret: String,
}

#[derive(Deserialize)]
struct NameFilterArgs {
    #[serde(default)]
    filter: Option<String>,
}

#[derive(Deserialize)]
struct IdArgs {
    id: i64,
}

#[derive(Deserialize)]
struct JobLaunchArgs {
    template_id: i64,
    #[serde(default)]
    extra_vars: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct JobsListArgs {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    job_template: Option<i64>,
    #[serde(default)]
    created_after: Option<String>,
}

#[derive(Deserialize)]
struct JobWaitArgs {
    id: i64,
    #[serde(default = "default_poll_interval")]
    poll_interval_secs: u64,
    #[serde(default = "default_wait_timeout")]
    timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_wait_timeout() -> u64 {
    600
}

#[derive(Deserialize)]
struct JobEventsArgs {
    id: i64,
    #[serde(default)]
    failed_only: bool,
}

#[derive(Deserialize)]
struct SystemInfoArgs {
    #[serde(default = "default_section")]
    section: SystemInfoSection,
}

fn default_section() -> SystemInfoSection {
    SystemInfoSection::Config
}

// ----------------------------------------------------------------------

/// Dispatch one invocation against the shared application context.
pub async fn dispatch(app: &AppContext, request: ToolRequest) -> ToolResponse {
    let tool = request.tool.clone();
    match run(app, request).await {
        Ok(result) => ToolResponse::ok(result),
        Err(DispatchError::Arguments(message)) => {
            warn!(tool = %tool, message = %message, "Rejected invocation arguments");
            ToolResponse::invalid(message)
        }
        Err(DispatchError::Awx(error)) => {
            warn!(tool = %tool, kind = error.kind(), %error, "Tool invocation failed");
            ToolResponse::from_error(error)
        }
    }
}

enum DispatchError {
    Arguments(String),
    Awx(AwxError),
}

impl From<AwxError> for DispatchError {
    fn from(error: AwxError) -> Self {
        Self::Awx(error)
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, DispatchError> {
    // Absent arguments deserialize like an empty object.
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| DispatchError::Arguments(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value)
        .map_err(|e| AwxError::protocol(format!("failed to encode result: {e}")).into())
}

async fn run(app: &AppContext, mut request: ToolRequest) -> Result<Value, DispatchError> {
    if catalog::find(&request.tool).is_none() {
        return Err(DispatchError::Arguments(format!(
            "unknown tool '{}'",
            request.tool
        )));
    }

    info!(tool = %request.tool, environment = ?request.environment, "Dispatching tool invocation");

    let arguments = std::mem::take(&mut request.arguments);

    match request.tool.as_str() {
        // Environment management operates directly on the registry.
        "env_list" => {
            let environments =
                app.with_registry(|registry| registry.list().to_vec());
            to_value(&environments)
        }
        "env_add" => {
            let args: EnvAddArgs = parse_args(arguments)?;
            let config = build_environment(args)?;
            let id = config.id;
            let name = config.name.clone();
            app.with_registry(|registry| registry.add(config))?;
            Ok(json!({ "id": id, "name": name }))
        }
        "env_update" => {
            let args: EnvUpdateArgs = parse_args(arguments)?;
            let id = args.id;
            let config = build_environment(args.record)?;
            app.with_registry(|registry| registry.update(id, config))?;
            Ok(json!({ "id": id }))
        }
        "env_remove" => {
            let args: EnvNameArgs = parse_args(arguments)?;
            let id = app.with_registry(|registry| {
                let id = registry.get_by_name(&args.name)?.id;
                registry.remove(id)?;
                Ok::<_, AwxError>(id)
            })?;
            Ok(json!({ "removed": id }))
        }
        "env_set_default" => {
            let args: EnvNameArgs = parse_args(arguments)?;
            app.with_registry(|registry| {
                let id = registry.get_by_name(&args.name)?.id;
                registry.set_default(id)
            })?;
            Ok(json!({ "default": args.name }))
        }
        "env_test_connection" => {
            let session = session_for(app, &request).await?;
            let info = session.client().ping().await?;
            to_value(&info)
        }

        // Stored-credential management.
        "credential_store" => {
            let args: CredentialStoreArgs = parse_args(arguments)?;
            if args.credential_type == CredentialType::Password && args.username.is_none() {
                return Err(DispatchError::Arguments(
                    "username is required for password credentials".into(),
                ));
            }
            let env_id = app.with_registry(|registry| {
                registry.get_by_name(&args.environment).map(|e| e.id)
            })?;
            app.store().store(
                env_id,
                StoredCredential {
                    credential_type: args.credential_type,
                    username: args.username,
                    secret: args.secret,
                },
            )?;
            Ok(json!({ "stored": args.environment }))
        }
        "credential_delete" => {
            let args: EnvNameArgs = parse_args(arguments)?;
            let env_id = app
                .with_registry(|registry| registry.get_by_name(&args.name).map(|e| e.id))?;
            app.store().delete(env_id)?;
            Ok(json!({ "deleted": args.name }))
        }

        // Platform operations run inside a session.
        "system_info" => {
            let args: SystemInfoArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let info = session.client().system_info(args.section).await?;
            Ok(info)
        }
        "organizations_list" => {
            let args: NameFilterArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let organizations: Vec<_> = session
                .client()
                .list_organizations(args.filter.as_deref())
                .try_collect()
                .await?;
            to_value(&organizations)
        }
        "organization_get" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let organization = session.client().get_organization(args.id).await?;
            to_value(&organization)
        }
        "job_templates_list" => {
            let args: NameFilterArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let templates: Vec<_> = session
                .client()
                .list_job_templates(args.filter.as_deref())
                .try_collect()
                .await?;
            to_value(&templates)
        }
        "job_template_get" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let template = session.client().get_job_template(args.id).await?;
            to_value(&template)
        }
        "job_launch" => {
            let args: JobLaunchArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let handle = session
                .engine()
                .launch(args.template_id, args.extra_vars)
                .await?;
            to_value(&handle)
        }
        "jobs_list" => {
            let args: JobsListArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let filters = crate::client::JobFilters {
                status: args.status,
                job_template: args.job_template,
                created_after: args.created_after,
            };
            let jobs: Vec<_> = session.client().list_jobs(&filters).try_collect().await?;
            to_value(&jobs)
        }
        "job_get" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let job = session.client().get_job(args.id).await?;
            to_value(&job)
        }
        "job_wait" => {
            let args: JobWaitArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let job = session.client().get_job(args.id).await?;
            let mut handle = JobHandle::new(job.id);
            handle.observe(job.status);
            let state = session
                .engine()
                .wait_for_terminal(
                    &mut handle,
                    Duration::from_secs(args.poll_interval_secs),
                    Duration::from_secs(args.timeout_secs),
                )
                .await?;
            Ok(json!({ "id": handle.id, "state": state }))
        }
        "job_cancel" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let job = session.client().get_job(args.id).await?;
            let mut handle = JobHandle::new(job.id);
            handle.observe(job.status);
            let state = session.engine().cancel(&mut handle).await?;
            Ok(json!({ "id": handle.id, "state": state }))
        }
        "job_output_get" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let output = session.client().get_job_output(args.id).await?;
            Ok(json!({ "id": args.id, "output": output }))
        }
        "job_events_get" => {
            let args: JobEventsArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let events: Vec<_> = session
                .client()
                .list_job_events(args.id, args.failed_only)
                .try_collect()
                .await?;
            to_value(&events)
        }
        "job_failure_summary" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let summary = session.engine().failure_summary(args.id).await?;
            to_value(&summary)
        }
        "inventories_list" => {
            let args: NameFilterArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let inventories: Vec<_> = session
                .client()
                .list_inventories(args.filter.as_deref())
                .try_collect()
                .await?;
            to_value(&inventories)
        }
        "inventory_hosts_list" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let hosts: Vec<_> = session
                .client()
                .list_inventory_hosts(args.id)
                .try_collect()
                .await?;
            to_value(&hosts)
        }
        "projects_list" => {
            let args: NameFilterArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let projects: Vec<_> = session
                .client()
                .list_projects(args.filter.as_deref())
                .try_collect()
                .await?;
            to_value(&projects)
        }
        "project_update" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let update = session.client().update_project(args.id).await?;
            to_value(&update)
        }
        "workflow_templates_list" => {
            let args: NameFilterArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let workflows: Vec<_> = session
                .client()
                .list_workflow_templates(args.filter.as_deref())
                .try_collect()
                .await?;
            to_value(&workflows)
        }
        "workflow_launch" => {
            let args: IdArgs = parse_args(arguments)?;
            let session = session_for(app, &request).await?;
            let workflow = session.client().launch_workflow(args.id).await?;
            to_value(&workflow)
        }

        // Unreachable: catalog membership was checked above.
        other => Err(DispatchError::Arguments(format!("unknown tool '{other}'"))),
    }
}

/// Resolve the session this invocation runs in: an explicitly created
/// one when `session_id` is given, otherwise a fresh isolated session
/// for this single call.
async fn session_for(
    app: &AppContext,
    request: &ToolRequest,
) -> Result<Arc<SessionContext>, DispatchError> {
    if let Some(session_id) = request.session_id {
        return app
            .sessions
            .get(session_id)
            .ok_or_else(|| DispatchError::Awx(AwxError::not_found(format!("session {session_id}"))));
    }
    let user = request.user.as_deref().unwrap_or("default");
    Ok(app
        .open_session(
            request.environment.as_deref(),
            request.credential_override.as_ref(),
            user,
        )
        .await?)
}

fn build_environment(args: EnvAddArgs) -> Result<EnvironmentConfig, DispatchError> {
    let platform_type = match args.platform_type.as_deref() {
        None => PlatformType::Awx,
        Some(raw) => PlatformType::from_str(raw).ok_or_else(|| {
            DispatchError::Arguments(format!(
                "unknown platform_type '{raw}' (expected awx, aap or tower)"
            ))
        })?,
    };

    let mut config = EnvironmentConfig::new(args.name, args.base_url).with_platform(platform_type);
    config.verify_ssl = args.verify_ssl;
    config.is_default = args.is_default;
    Ok(config)
}
