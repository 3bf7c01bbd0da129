//! Connection and polling configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{BmcError, Result};

/// Redfish REST API configuration
#[derive(Debug, Clone)]
pub struct RedfishConfig {
    /// Controller address (`host`, `host:port` or URL); see [`RedfishConfig::endpoint_identity`]
    pub endpoint: String,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Skip TLS verification (for self-signed certs)
    pub insecure: bool,
    /// ComputerSystem member id
    pub system_id: String,
    /// Manager member id
    pub manager_id: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl RedfishConfig {
    /// Create new Redfish config
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            insecure: false,
            system_id: "System.Embedded.1".to_string(),
            manager_id: "iDRAC.Embedded.1".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Allow insecure TLS (self-signed certs)
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }

    pub fn with_manager_id(mut self, manager_id: impl Into<String>) -> Self {
        self.manager_id = manager_id.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL, `https://` unless the endpoint names a scheme
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        }
    }

    /// Controller identity used for locking: lowercase `host:port`
    ///
    /// `10.0.0.5`, `https://10.0.0.5/` and `10.0.0.5:443` all name the same
    /// controller and share one lock.
    pub fn endpoint_identity(&self) -> String {
        let base = self.base_url();
        let (scheme, rest) = base.split_once("://").unwrap_or(("https", base.as_str()));
        let authority = rest.split('/').next().unwrap_or(rest).to_ascii_lowercase();
        let has_port = match authority.rfind(']') {
            Some(end) => authority[end..].contains(':'),
            None => authority.contains(':'),
        };
        if has_port {
            authority
        } else {
            let port = if scheme.eq_ignore_ascii_case("http") { 80 } else { 443 };
            format!("{}:{}", authority, port)
        }
    }

    /// Reject configs that cannot possibly connect
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(BmcError::InvalidConfig("endpoint must not be empty".to_string()));
        }
        if self.username.is_empty() {
            return Err(BmcError::InvalidConfig("username must not be empty".to_string()));
        }
        if self.system_id.is_empty() || self.manager_id.is_empty() {
            return Err(BmcError::InvalidConfig(
                "system and manager ids must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Poll intervals and the settings-commit threshold
///
/// Defaults match what iDRAC-class controllers need in practice: POST entry
/// is short-lived and polled every second, everything else every two seconds,
/// tasks every five.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollTiming {
    pub power_poll_secs: u64,
    pub post_entry_poll_secs: u64,
    pub post_exit_poll_secs: u64,
    pub settings_poll_secs: u64,
    pub task_poll_secs: u64,
    /// Pending attribute count above which a settings commit counts as finished
    pub commit_threshold: usize,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            power_poll_secs: 2,
            post_entry_poll_secs: 1,
            post_exit_poll_secs: 2,
            settings_poll_secs: 2,
            task_poll_secs: 5,
            commit_threshold: 5,
        }
    }
}

impl PollTiming {
    pub fn power_poll(&self) -> Duration {
        Duration::from_secs(self.power_poll_secs)
    }

    pub fn post_entry_poll(&self) -> Duration {
        Duration::from_secs(self.post_entry_poll_secs)
    }

    pub fn post_exit_poll(&self) -> Duration {
        Duration::from_secs(self.post_exit_poll_secs)
    }

    pub fn settings_poll(&self) -> Duration {
        Duration::from_secs(self.settings_poll_secs)
    }

    pub fn task_poll(&self) -> Duration {
        Duration::from_secs(self.task_poll_secs)
    }
}
