use std::time::Duration;

use bmcwarden_bmc::{HostEngine, ResetType};
use clap::{Args, ValueEnum};
use color_eyre::eyre::Result;

use super::locked;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerTarget {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct PowerArgs {
    /// Target power state
    #[arg(value_enum)]
    pub state: PowerTarget,

    /// Seconds to wait for the host to reach the state
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Redfish ResetType, e.g. ForceRestart or GracefulShutdown
    pub reset_type: ResetType,

    /// Seconds to wait for the reset to complete
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,
}

pub async fn run_status(engine: &HostEngine) -> Result<()> {
    let status = engine.host_status().await?;
    println!("Endpoint: {}", engine.endpoint());
    println!("Power:    {}", status.power);
    println!("In POST:  {}", if status.in_post { "yes" } else { "no" });
    Ok(())
}

pub async fn run_power(engine: &HostEngine, args: PowerArgs) -> Result<()> {
    let on = args.state == PowerTarget::On;
    let timeout = Duration::from_secs(args.timeout);
    locked(engine, engine.change_power_state(on, timeout)).await?;
    println!("Host is powered {}", if on { "on" } else { "off" });
    Ok(())
}

pub async fn run_reset(engine: &HostEngine, args: ResetArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    locked(engine, engine.reset_host(args.reset_type, timeout)).await?;
    println!("{} completed", args.reset_type);
    Ok(())
}
