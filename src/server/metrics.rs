//! Process-local counters exposed in Prometheus text format.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    tool_calls_total: AtomicU64,
    tool_failures_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_call(&self, failed: bool) {
        self.tool_calls_total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.tool_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Render the counters plus the current session gauge.
    pub fn render(&self, active_sessions: usize) -> String {
        let mut out = String::new();
        for (name, help, value) in [
            (
                "awx_mcp_requests_total",
                "Total HTTP requests received",
                self.requests_total.load(Ordering::Relaxed),
            ),
            (
                "awx_mcp_tool_calls_total",
                "Total tool invocations dispatched",
                self.tool_calls_total.load(Ordering::Relaxed),
            ),
            (
                "awx_mcp_tool_failures_total",
                "Tool invocations that returned an error",
                self.tool_failures_total.load(Ordering::Relaxed),
            ),
        ] {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            ));
        }
        out.push_str(&format!(
            "# HELP awx_mcp_active_sessions Sessions currently open\n# TYPE awx_mcp_active_sessions gauge\nawx_mcp_active_sessions {active_sessions}\n"
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_reports_counts() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_tool_call(false);
        metrics.record_tool_call(true);

        let text = metrics.render(2);
        assert!(text.contains("awx_mcp_requests_total 1"));
        assert!(text.contains("awx_mcp_tool_calls_total 2"));
        assert!(text.contains("awx_mcp_tool_failures_total 1"));
        assert!(text.contains("awx_mcp_active_sessions 2"));
    }
}
