use super::metrics::Metrics;
use crate::app::AppContext;
use std::sync::Arc;

pub(crate) struct ServerState {
    app: Arc<AppContext>,
    metrics: Arc<Metrics>,
}

impl ServerState {
    pub(crate) fn new(app: Arc<AppContext>) -> Self {
        Self {
            app,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub(crate) fn app(&self) -> &Arc<AppContext> {
        &self.app
    }

    pub(crate) fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
