use std::{fs, str::FromStr};

use anyhow::bail;
use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";
const MAX_IDLE_TIMEOUT_SECONDS: i64 = i64::MAX / 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub log_filter: String,
    pub session_idle_timeout_seconds: i64,
    pub max_sessions: usize,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            log_filter: "info".into(),
            session_idle_timeout_seconds: 30 * 60,
            max_sessions: 1024,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Settings {
    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_idle_timeout_seconds <= 0
            || self.session_idle_timeout_seconds > MAX_IDLE_TIMEOUT_SECONDS
        {
            bail!(
                "session_idle_timeout_seconds must be between 1 and {MAX_IDLE_TIMEOUT_SECONDS}, got {}",
                self.session_idle_timeout_seconds
            );
        }
        if self.max_sessions == 0 {
            bail!("max_sessions must be at least 1");
        }
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be at least 1");
        }
        Ok(())
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<toml::Table>(raw) {
        Ok(table) => table,
        Err(error) => {
            warn!(file = SETTINGS_FILE, %error, "ignoring unparsable settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        set_from_toml(&mut settings.server_bind, "bind_addr", v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        set_from_toml(&mut settings.log_filter, "log_filter", v);
    }
    if let Some(v) = file_cfg.get("session_idle_timeout_seconds") {
        set_from_toml(
            &mut settings.session_idle_timeout_seconds,
            "session_idle_timeout_seconds",
            v,
        );
    }
    if let Some(v) = file_cfg.get("max_sessions") {
        set_from_toml(&mut settings.max_sessions, "max_sessions", v);
    }
    if let Some(v) = file_cfg.get("max_body_bytes") {
        set_from_toml(&mut settings.max_body_bytes, "max_body_bytes", v);
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = var("APP__SESSION_IDLE_TIMEOUT_SECONDS") {
        set_parsed(&mut settings.session_idle_timeout_seconds, &v);
    }
    if let Some(v) = var("APP__MAX_SESSIONS") {
        set_parsed(&mut settings.max_sessions, &v);
    }
    if let Some(v) = var("APP__MAX_BODY_BYTES") {
        set_parsed(&mut settings.max_body_bytes, &v);
    }
}

fn set_parsed<T: FromStr>(slot: &mut T, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<T>() {
        *slot = parsed;
    }
}

/// Accepts both `key = 16` and `key = "16"`.
fn set_from_toml<T: FromStr>(slot: &mut T, key: &str, value: &toml::Value) {
    let raw = match value {
        toml::Value::String(v) => v.clone(),
        toml::Value::Integer(v) => v.to_string(),
        other => {
            warn!(key, kind = other.type_str(), "ignoring setting with unsupported type");
            return;
        }
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value = %raw, "ignoring unparsable setting"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
