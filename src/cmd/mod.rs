//! Subcommand implementations
//!
//! Every command connects one [`HostEngine`]; mutating commands run inside
//! [`locked`] so the endpoint lock spans the first write to the final wait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bmcwarden_bmc::{EndpointLocks, HostEngine, RedfishConfig, RedfishSession};
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use crate::config::FileConfig;

pub mod power;
pub mod settings;
pub mod task;
pub mod volume;

/// Controller connection options
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Controller address (host, host:port or URL)
    #[arg(long, env = "BMCWARDEN_ENDPOINT")]
    pub endpoint: String,

    /// Controller username
    #[arg(long, env = "BMCWARDEN_USERNAME")]
    pub username: String,

    /// Controller password
    #[arg(long, env = "BMCWARDEN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Accept self-signed controller certificates
    #[arg(long)]
    pub insecure: bool,
}

impl ConnectionArgs {
    fn redfish_config(&self, file: &FileConfig) -> RedfishConfig {
        let mut config = RedfishConfig::new(&self.endpoint, &self.username, &self.password)
            .with_insecure(self.insecure);
        if let Some(system_id) = &file.system_id {
            config = config.with_system_id(system_id);
        }
        if let Some(manager_id) = &file.manager_id {
            config = config.with_manager_id(manager_id);
        }
        if let Some(secs) = file.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Connect to the controller and build the engine
pub async fn connect(args: &ConnectionArgs, file: &FileConfig) -> Result<HostEngine> {
    let config = args.redfish_config(file);
    config.validate()?;
    info!(endpoint = %config.endpoint, "Connecting to controller");
    let session = RedfishSession::connect(config)
        .await
        .wrap_err_with(|| format!("Failed to connect to {}", args.endpoint))?;
    Ok(HostEngine::new(Arc::new(session), EndpointLocks::new()).with_timing(file.timing.clone()))
}

/// Run `operation` while holding the engine's endpoint lock
pub async fn locked<T, F>(engine: &HostEngine, operation: F) -> bmcwarden_bmc::Result<T>
where
    F: Future<Output = bmcwarden_bmc::Result<T>>,
{
    let guard = engine.lock().await;
    let result = operation.await;
    engine.unlock(guard);
    result
}
