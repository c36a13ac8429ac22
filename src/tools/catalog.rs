//! The fixed catalogue of named operations exposed to invoking clients.

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "env_list",
        description: "List registered environments in registration order",
    },
    ToolSpec {
        name: "env_add",
        description: "Register a new environment (name, base_url, platform_type, verify_ssl)",
    },
    ToolSpec {
        name: "env_update",
        description: "Replace an environment record wholesale",
    },
    ToolSpec {
        name: "env_remove",
        description: "Delete an environment",
    },
    ToolSpec {
        name: "env_set_default",
        description: "Mark an environment as the default, clearing the previous one",
    },
    ToolSpec {
        name: "env_test_connection",
        description: "Ping an environment and report canonical platform info",
    },
    ToolSpec {
        name: "credential_store",
        description: "Store or rotate the credential bound to an environment",
    },
    ToolSpec {
        name: "credential_delete",
        description: "Delete the stored credential of an environment",
    },
    ToolSpec {
        name: "system_info",
        description: "Fetch raw platform metadata (config, dashboard, settings or me)",
    },
    ToolSpec {
        name: "organizations_list",
        description: "List organizations, optionally filtered by name",
    },
    ToolSpec {
        name: "organization_get",
        description: "Fetch one organization by id",
    },
    ToolSpec {
        name: "job_templates_list",
        description: "List job templates, optionally filtered by name",
    },
    ToolSpec {
        name: "job_template_get",
        description: "Fetch one job template by id",
    },
    ToolSpec {
        name: "job_launch",
        description: "Launch a job template; returns a pending job handle",
    },
    ToolSpec {
        name: "jobs_list",
        description: "List jobs with optional status/template/date filters",
    },
    ToolSpec {
        name: "job_get",
        description: "Fetch one job by id",
    },
    ToolSpec {
        name: "job_wait",
        description: "Poll a job until it reaches a terminal state or the deadline elapses",
    },
    ToolSpec {
        name: "job_cancel",
        description: "Cancel a job; a no-op when it is already terminal",
    },
    ToolSpec {
        name: "job_output_get",
        description: "Fetch job stdout, falling back to job events when unavailable",
    },
    ToolSpec {
        name: "job_events_get",
        description: "List job events, optionally only failed ones",
    },
    ToolSpec {
        name: "job_failure_summary",
        description: "Classify why a job failed and suggest fixes",
    },
    ToolSpec {
        name: "inventories_list",
        description: "List inventories, optionally filtered by name",
    },
    ToolSpec {
        name: "inventory_hosts_list",
        description: "List the hosts of an inventory",
    },
    ToolSpec {
        name: "projects_list",
        description: "List projects, optionally filtered by name",
    },
    ToolSpec {
        name: "project_update",
        description: "Trigger an SCM refresh of a project",
    },
    ToolSpec {
        name: "workflow_templates_list",
        description: "List workflow templates, optionally filtered by name",
    },
    ToolSpec {
        name: "workflow_launch",
        description: "Launch a workflow template",
    },
];

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}
