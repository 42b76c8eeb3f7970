use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use demo_apps::Rendered;
use reactive::{App, Session};
use shared::{domain::SessionId, protocol::ServerEvent};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::config::Settings;

pub(crate) const SESSION_EVENT_CAPACITY: usize = 64;

pub(crate) struct SessionEntry {
    pub(crate) app: String,
    pub(crate) session: Session<Rendered>,
    pub(crate) last_seen: DateTime<Utc>,
    pub(crate) events: broadcast::Sender<ServerEvent>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionLimits {
    pub(crate) max_sessions: usize,
    pub(crate) idle_timeout: Duration,
}

impl TryFrom<&Settings> for SessionLimits {
    type Error = anyhow::Error;

    fn try_from(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let idle_timeout = Duration::try_seconds(settings.session_idle_timeout_seconds)
            .context("session_idle_timeout_seconds is out of range")?;
        Ok(Self {
            max_sessions: settings.max_sessions,
            idle_timeout,
        })
    }
}

pub(crate) struct AppState {
    pub(crate) apps: BTreeMap<String, App<Rendered>>,
    pub(crate) sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionEntry>>>>,
    pub(crate) limits: SessionLimits,
}

impl AppState {
    pub(crate) fn new(apps: Vec<App<Rendered>>, limits: SessionLimits) -> Self {
        Self {
            apps: apps
                .into_iter()
                .map(|app| (app.name().to_string(), app))
                .collect(),
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }
}

#[cfg(test)]
#[path = "tests/app_state_tests.rs"]
mod tests;
