//! Job lifecycle engine: launch, poll to a terminal state, cancel.
//!
//! Observed state transitions are monotonic. A handle that has reached
//! a terminal state never changes again, regardless of what a stale
//! poll reports.

use crate::client::PlatformClient;
use crate::domain::{AwxError, JobEvent, JobStatus};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub mod failure;

pub use failure::{FailureCategory, FailureSummary};

/// Client-side view of one platform job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    pub id: i64,
    pub state: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_polled: Option<DateTime<Utc>>,
}

impl JobHandle {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            state: JobStatus::Pending,
            created_at: Utc::now(),
            last_polled: None,
        }
    }

    /// Fold an observed platform state into the handle, keeping the
    /// transition history monotonic.
    pub fn observe(&mut self, observed: JobStatus) {
        self.last_polled = Some(Utc::now());
        if self.state.is_terminal() {
            return;
        }
        if observed.rank() >= self.state.rank() {
            self.state = observed;
        }
    }
}

/// Drives job lifecycles over a session's platform client. In-flight
/// call limiting happens in the client's transport, so nothing here
/// needs a permit.
pub struct JobEngine {
    client: Arc<PlatformClient>,
}

impl JobEngine {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PlatformClient> {
        &self.client
    }

    /// Launch a job from a template. Returns a pending handle as soon
    /// as the platform accepts the request; never blocks for completion.
    pub async fn launch(
        &self,
        template_id: i64,
        extra_vars: Option<Map<String, Value>>,
    ) -> Result<JobHandle, AwxError> {
        let job = self.client.launch_job_template(template_id, extra_vars).await?;
        let mut handle = JobHandle::new(job.id);
        handle.observe(job.status);
        Ok(handle)
    }

    /// Poll until the job reaches a terminal state or the deadline
    /// elapses. On timeout the platform-side job keeps running; the
    /// error reports the last observed state.
    pub async fn wait_for_terminal(
        &self,
        handle: &mut JobHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<JobStatus, AwxError> {
        let deadline = Instant::now() + timeout;

        loop {
            if handle.state.is_terminal() {
                return Ok(handle.state);
            }

            let job = self.client.get_job(handle.id).await?;
            handle.observe(job.status);
            debug!(job_id = handle.id, state = %handle.state, "Polled job");
            if handle.state.is_terminal() {
                return Ok(handle.state);
            }

            // Time out only once the deadline has actually passed; the
            // last sleep is shortened so a final poll lands on it.
            let now = Instant::now();
            if now >= deadline {
                return Err(AwxError::Timeout {
                    job_id: handle.id,
                    last_state: handle.state,
                });
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// Classify why a job failed from its failed events and output.
    pub async fn failure_summary(&self, job_id: i64) -> Result<FailureSummary, AwxError> {
        let events: Vec<JobEvent> = self.client.list_job_events(job_id, true).try_collect().await?;
        let stdout = match self.client.get_job_output(job_id).await {
            Ok(output) => output,
            Err(AwxError::NotFound { .. }) => String::new(),
            Err(e) => return Err(e),
        };
        Ok(failure::analyze(job_id, &events, &stdout))
    }

    /// Cancel a job. Calling this on a handle that is already terminal
    /// is a no-op returning the current state.
    pub async fn cancel(&self, handle: &mut JobHandle) -> Result<JobStatus, AwxError> {
        if handle.state.is_terminal() {
            return Ok(handle.state);
        }

        let cancel_result = self.client.cancel_job(handle.id).await;
        // The platform refuses cancellation of finished jobs; re-read
        // before treating that refusal as a failure.
        let job = self.client.get_job(handle.id).await?;
        handle.observe(job.status);

        match cancel_result {
            Ok(()) => Ok(handle.state),
            Err(_) if handle.state.is_terminal() => Ok(handle.state),
            Err(e) => Err(e),
        }
    }
}
