use std::env;

use tracing::{info, warn};

const USER_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];
const UNKNOWN_USER: &str = "unknown";

/// Facts about the host process, looked up once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub username: String,
}

impl HostInfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Resolves the account running this process: login variables first,
    /// then the password database entry for the process uid.
    pub fn detect() -> Self {
        let host = Self::from_lookup(
            |key| env::var(key).ok(),
            || match whoami::fallible::username() {
                Ok(name) => Some(name),
                Err(error) => {
                    warn!(%error, "account lookup failed");
                    None
                }
            },
        );
        info!(username = %host.username, "resolved host account");
        host
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        account: impl FnOnce() -> Option<String>,
    ) -> Self {
        let username = USER_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .chain(std::iter::once_with(account).flatten())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        Self { username }
    }
}
