//! Failure classification for finished jobs.
//!
//! Works purely on already-fetched failed events and job output, so it
//! never touches the wire itself and stays cheap to unit-test.

use crate::domain::JobEvent;
use serde::Serialize;

/// Coarse cause of a job failure, derived from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    InventoryIssue,
    AuthFailure,
    MissingVariable,
    SyntaxError,
    ModuleFailure,
    ConnectionTimeout,
    PermissionDenied,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub job_id: i64,
    pub category: FailureCategory,
    pub failed_events_count: usize,
    pub task: Option<String>,
    pub play: Option<String>,
    pub host: Option<String>,
    pub error_message: Option<String>,
    pub suggested_fixes: Vec<String>,
}

/// Summarize a failed job from its failed events and captured output.
/// The first failed event anchors the diagnosis; job stdout is the
/// fallback when the event carries no text of its own.
pub fn analyze(job_id: i64, events: &[JobEvent], stdout: &str) -> FailureSummary {
    let first = events.iter().find(|event| event.failed);

    let error_message = first
        .and_then(|event| event.stdout.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned);

    let task = first.and_then(|event| event.task.clone());
    let evidence = error_message.as_deref().unwrap_or_else(|| tail(stdout));
    let category = classify(evidence, task.as_deref());

    FailureSummary {
        job_id,
        category,
        failed_events_count: events.iter().filter(|event| event.failed).count(),
        task,
        play: first.and_then(|event| event.play.clone()),
        host: first.and_then(|event| event.host_name.clone()),
        error_message,
        suggested_fixes: suggestions(category),
    }
}

/// Last stretch of the job output, where ansible prints its recap and
/// the fatal message.
fn tail(stdout: &str) -> &str {
    let trimmed = stdout.trim_end();
    match trimmed.char_indices().rev().nth(2000) {
        Some((index, _)) => &trimmed[index..],
        None => trimmed,
    }
}

fn classify(evidence: &str, task: Option<&str>) -> FailureCategory {
    let text = evidence.to_lowercase();

    if contains_any(
        &text,
        &["unreachable", "could not resolve hostname", "connection refused"],
    ) {
        return FailureCategory::InventoryIssue;
    }
    if contains_any(
        &text,
        &[
            "authentication failed",
            "invalid credentials",
            "unauthorized",
            "permission denied (publickey",
        ],
    ) {
        return FailureCategory::AuthFailure;
    }
    if text.contains("undefined variable") {
        return FailureCategory::MissingVariable;
    }
    if contains_any(
        &text,
        &["syntax error", "yaml syntax", "unexpected token", "invalid syntax"],
    ) {
        return FailureCategory::SyntaxError;
    }
    if text.contains("permission denied") {
        return FailureCategory::PermissionDenied;
    }
    if contains_any(&text, &["timeout", "timed out"]) {
        return FailureCategory::ConnectionTimeout;
    }
    if let Some(task) = task {
        let task = task.to_lowercase();
        let package_task = contains_any(&task, &["yum", "apt", "dnf", "package"]);
        if package_task && contains_any(&text, &["no package", "not found"]) {
            return FailureCategory::ModuleFailure;
        }
    }
    FailureCategory::Unknown
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn suggestions(category: FailureCategory) -> Vec<String> {
    let fixes: &[&str] = match category {
        FailureCategory::InventoryIssue => &[
            "Verify the host exists in the inventory and resolves over DNS",
            "Check network reachability from the execution node to the host",
            "Confirm the connection port in the inventory host variables",
        ],
        FailureCategory::AuthFailure => &[
            "Verify the machine credential attached to the job template",
            "Check that the remote account is not locked or expired",
            "Confirm SSH keys or passwords match what the hosts expect",
        ],
        FailureCategory::MissingVariable => &[
            "Define the missing variable in extra_vars or the inventory",
            "Check survey defaults on the job template",
            "Guard optional variables with a default() filter in the playbook",
        ],
        FailureCategory::SyntaxError => &[
            "Run ansible-playbook --syntax-check against the playbook",
            "Validate the YAML indentation around the reported line",
            "Re-sync the project so the platform runs the fixed revision",
        ],
        FailureCategory::ModuleFailure => &[
            "Check the package name and that its repository is enabled",
            "Refresh the package cache on the target host",
            "Confirm the module's requirements exist on the target",
        ],
        FailureCategory::ConnectionTimeout => &[
            "Raise the connection timeout in the job template settings",
            "Check for firewalls dropping long-lived connections",
            "Verify the host is not overloaded or mid-reboot",
        ],
        FailureCategory::PermissionDenied => &[
            "Check privilege escalation (become) settings on the template",
            "Verify the remote user may access the files the task touches",
            "Review sudoers rules for the escalated account",
        ],
        FailureCategory::Unknown => &[
            "Inspect the full job output for the first fatal message",
            "Re-run the job with increased verbosity",
        ],
    };
    fixes.iter().map(|fix| (*fix).to_string()).collect()
}
