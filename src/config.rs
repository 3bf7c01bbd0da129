//! Optional YAML configuration file

use std::path::Path;

use bmcwarden_bmc::PollTiming;
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;

/// Settings that rarely change between invocations
///
/// ```yaml
/// system_id: System.Embedded.1
/// manager_id: iDRAC.Embedded.1
/// request_timeout_secs: 30
/// timing:
///   task_poll_secs: 10
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub system_id: Option<String>,
    pub manager_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub timing: PollTiming,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
