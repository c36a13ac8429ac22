//! The platform-facing client: one canonical operation surface across
//! the AWX, AAP and Tower dialects.
//!
//! A client is built once per resolved credential + environment pair and
//! is never shared between sessions holding different credentials. It
//! holds the authentication material opaquely; callers only see the
//! operations.

use crate::client::pagination::{paginate, PageStream};
use crate::client::platform;
use crate::client::transport::{with_retry, RetryPolicy, Transport};
use crate::domain::{
    AwxError, EnvironmentConfig, Inventory, InventoryHost, Job, JobEvent, JobTemplate,
    Organization, PlatformInfo, Project, ProjectUpdate, WorkflowJob, WorkflowTemplate,
};
use futures::StreamExt;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Optional filters for job listings.
#[derive(Debug, Default, Clone)]
pub struct JobFilters {
    pub status: Option<String>,
    pub job_template: Option<i64>,
    pub created_after: Option<String>,
}

/// Sections of platform metadata reachable through `system_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemInfoSection {
    Config,
    Dashboard,
    Settings,
    Me,
}

impl SystemInfoSection {
    fn path(self) -> &'static str {
        match self {
            SystemInfoSection::Config => "config/",
            SystemInfoSection::Dashboard => "dashboard/",
            SystemInfoSection::Settings => "settings/",
            SystemInfoSection::Me => "me/",
        }
    }
}

pub struct PlatformClient {
    environment: EnvironmentConfig,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl PlatformClient {
    /// Build over an explicit transport. Production callers hand in a
    /// rate-limited reqwest transport; tests inject fakes here.
    pub fn with_transport(
        environment: EnvironmentConfig,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            environment,
            transport,
            retry,
        }
    }

    pub fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, AwxError> {
        with_retry(self.retry, path, || {
            self.transport.request_json(Method::GET, path, query, None)
        })
        .await
    }

    async fn post_json(&self, path: &str, body: Option<&Value>) -> Result<Value, AwxError> {
        with_retry(self.retry, path, || {
            self.transport.request_json(Method::POST, path, &[], body)
        })
        .await
    }

    fn list<T>(&self, path: &str, query: Vec<(String, String)>) -> PageStream<T>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        paginate(
            Arc::clone(&self.transport),
            self.retry,
            path.to_string(),
            query,
        )
    }

    /// Connection test. Reports the dialect's version metadata in one
    /// canonical shape regardless of platform.
    pub async fn ping(&self) -> Result<PlatformInfo, AwxError> {
        let payload = self.get_json("ping/", &[]).await?;
        let profile = platform::profile(self.environment.platform_type);
        let version = profile
            .version_fields
            .iter()
            .find_map(|field| payload.get(field).and_then(Value::as_str))
            .map(ToOwned::to_owned);

        Ok(PlatformInfo {
            platform_type: self.environment.platform_type,
            version,
            active_node: payload
                .get("active_node")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        })
    }

    /// Raw platform metadata for one section. The payload shape varies
    /// between dialects and versions, so it is passed through untouched.
    pub async fn system_info(&self, section: SystemInfoSection) -> Result<Value, AwxError> {
        self.get_json(section.path(), &[]).await
    }

    pub fn list_organizations(&self, name_filter: Option<&str>) -> PageStream<Organization> {
        let mut query = Vec::new();
        if let Some(filter) = name_filter {
            query.push(("name__icontains".to_string(), filter.to_string()));
        }
        self.list("organizations/", query)
    }

    pub async fn get_organization(&self, organization_id: i64) -> Result<Organization, AwxError> {
        let payload = self
            .get_json(&format!("organizations/{organization_id}/"), &[])
            .await?;
        parse(payload, "organization")
    }

    pub fn list_job_templates(&self, name_filter: Option<&str>) -> PageStream<JobTemplate> {
        let mut query = Vec::new();
        if let Some(filter) = name_filter {
            query.push(("name__icontains".to_string(), filter.to_string()));
        }
        self.list("job_templates/", query)
    }

    pub async fn get_job_template(&self, template_id: i64) -> Result<JobTemplate, AwxError> {
        let payload = self
            .get_json(&format!("job_templates/{template_id}/"), &[])
            .await?;
        parse(payload, "job template")
    }

    /// Launch a job from a template. Fire-and-forget on the platform
    /// side: returns as soon as the launch is accepted.
    pub async fn launch_job_template(
        &self,
        template_id: i64,
        extra_vars: Option<Map<String, Value>>,
    ) -> Result<Job, AwxError> {
        let mut body = Map::new();
        if let Some(extra_vars) = extra_vars {
            body.insert("extra_vars".to_string(), Value::Object(extra_vars));
        }
        let payload = self
            .post_json(
                &format!("job_templates/{template_id}/launch/"),
                Some(&Value::Object(body)),
            )
            .await?;
        let job: Job = parse(payload, "launched job")?;
        info!(
            environment = %self.environment.name,
            template_id,
            job_id = job.id,
            "Job launched"
        );
        Ok(job)
    }

    pub fn list_jobs(&self, filters: &JobFilters) -> PageStream<Job> {
        let mut query = vec![("order_by".to_string(), "-id".to_string())];
        if let Some(status) = &filters.status {
            query.push(("status".to_string(), status.clone()));
        }
        if let Some(template) = filters.job_template {
            query.push(("job_template".to_string(), template.to_string()));
        }
        if let Some(created_after) = &filters.created_after {
            query.push(("created__gt".to_string(), created_after.clone()));
        }
        self.list("jobs/", query)
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Job, AwxError> {
        let payload = self.get_json(&format!("jobs/{job_id}/"), &[]).await?;
        parse(payload, "job")
    }

    /// Job stdout as plain text. Falls back to concatenated job events
    /// when the stdout endpoint is unavailable on this deployment.
    pub async fn get_job_output(&self, job_id: i64) -> Result<String, AwxError> {
        let query = [("format".to_string(), "txt".to_string())];
        let path = format!("jobs/{job_id}/stdout/");
        let result = with_retry(self.retry, "job stdout", || {
            self.transport.request_text(Method::GET, &path, &query)
        })
        .await;

        match result {
            Ok(output) => Ok(output),
            Err(AwxError::NotFound { .. }) => {
                debug!(job_id, "Stdout endpoint missing, falling back to job events");
                let mut events = self.get_job_events(job_id, false);
                let mut lines = Vec::new();
                while let Some(event) = events.next().await {
                    let event: JobEvent = event?;
                    if let Some(stdout) = event.stdout {
                        if !stdout.is_empty() {
                            lines.push(stdout);
                        }
                    }
                }
                if lines.is_empty() {
                    Err(AwxError::not_found(format!("output for job {job_id}")))
                } else {
                    Ok(lines.join("\n"))
                }
            }
            Err(e) => Err(e),
        }
    }

    pub fn list_job_events(&self, job_id: i64, failed_only: bool) -> PageStream<JobEvent> {
        self.get_job_events(job_id, failed_only)
    }

    fn get_job_events(&self, job_id: i64, failed_only: bool) -> PageStream<JobEvent> {
        let mut query = vec![("order_by".to_string(), "counter".to_string())];
        if failed_only {
            query.push(("failed".to_string(), "true".to_string()));
        }
        self.list(&format!("jobs/{job_id}/job_events/"), query)
    }

    /// Ask the platform to cancel a job. Callers go through the job
    /// engine, which makes cancellation of finished jobs a no-op.
    pub async fn cancel_job(&self, job_id: i64) -> Result<(), AwxError> {
        self.post_json(&format!("jobs/{job_id}/cancel/"), None)
            .await?;
        info!(environment = %self.environment.name, job_id, "Job cancel requested");
        Ok(())
    }

    pub fn list_inventories(&self, name_filter: Option<&str>) -> PageStream<Inventory> {
        let mut query = Vec::new();
        if let Some(filter) = name_filter {
            query.push(("name__icontains".to_string(), filter.to_string()));
        }
        self.list("inventories/", query)
    }

    pub fn list_inventory_hosts(&self, inventory_id: i64) -> PageStream<InventoryHost> {
        self.list(&format!("inventories/{inventory_id}/hosts/"), Vec::new())
    }

    pub fn list_projects(&self, name_filter: Option<&str>) -> PageStream<Project> {
        let mut query = Vec::new();
        if let Some(filter) = name_filter {
            query.push(("name__icontains".to_string(), filter.to_string()));
        }
        self.list("projects/", query)
    }

    /// Trigger an SCM refresh of a project.
    pub async fn update_project(&self, project_id: i64) -> Result<ProjectUpdate, AwxError> {
        let payload = self
            .post_json(&format!("projects/{project_id}/update/"), None)
            .await?;
        parse(payload, "project update")
    }

    pub fn list_workflow_templates(&self, name_filter: Option<&str>) -> PageStream<WorkflowTemplate> {
        let mut query = Vec::new();
        if let Some(filter) = name_filter {
            query.push(("name__icontains".to_string(), filter.to_string()));
        }
        self.list("workflow_job_templates/", query)
    }

    pub async fn launch_workflow(&self, workflow_id: i64) -> Result<WorkflowJob, AwxError> {
        let payload = self
            .post_json(
                &format!("workflow_job_templates/{workflow_id}/launch/"),
                Some(&json!({})),
            )
            .await?;
        let workflow: WorkflowJob = parse(payload, "workflow job")?;
        info!(
            environment = %self.environment.name,
            workflow_id,
            workflow_job_id = workflow.id,
            "Workflow launched"
        );
        Ok(workflow)
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: Value, what: &str) -> Result<T, AwxError> {
    serde_json::from_value(payload)
        .map_err(|e| AwxError::protocol(format!("malformed {what} payload: {e}")))
}
