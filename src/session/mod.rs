//! Per-connection session contexts.
//!
//! A session binds one environment to one resolved credential via a
//! dedicated platform client. Sessions are owned by the connection that
//! created them and are destroyed on disconnect; they are never shared
//! or cached by environment name, so two sessions against the same
//! `base_url` with different credentials can never observe each other's
//! authentication.

use crate::client::PlatformClient;
use crate::domain::EnvironmentConfig;
use crate::jobs::JobEngine;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

pub struct SessionContext {
    pub id: Uuid,
    pub user: String,
    pub environment: EnvironmentConfig,
    engine: JobEngine,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(user: impl Into<String>, environment: EnvironmentConfig, engine: JobEngine) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            environment,
            engine,
            created_at: Utc::now(),
        }
    }

    pub fn engine(&self) -> &JobEngine {
        &self.engine
    }

    pub fn client(&self) -> &Arc<PlatformClient> {
        self.engine.client()
    }
}

/// Connection-scoped session registry for remote mode.
#[derive(Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<Uuid, Arc<SessionContext>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<SessionContext>) -> Uuid {
        let id = session.id;
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .insert(id, session);
        debug!(session_id = %id, "Session opened");
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionContext>> {
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Tear down a session. In-flight poll loops for it are abandoned;
    /// platform-side jobs are not implicitly canceled.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self
            .sessions
            .lock()
            .expect("session map lock poisoned")
            .remove(&id)
            .is_some();
        if removed {
            debug!(session_id = %id, "Session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
