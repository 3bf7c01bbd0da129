use std::time::Duration;

use bmcwarden_bmc::{ApplyPolicy, HostEngine, ResetType};
use clap::Args;
use color_eyre::eyre::{eyre, Result};
use serde_json::{Map, Value};

use super::locked;

#[derive(Args, Debug)]
pub struct BootOrderArgs {
    /// Boot option ids in the desired order; must name every current option
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Reset used to apply the order; without it the order stays pending
    #[arg(long)]
    pub reset_type: Option<ResetType>,

    /// Seconds to wait for the reboot and settings commit
    #[arg(long, default_value_t = 1800)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct BiosArgs {
    /// Attributes as KEY=VALUE; integer values are sent as numbers
    #[arg(required = true, num_args = 1..)]
    pub attributes: Vec<String>,

    /// Reset used to apply the attributes when the host is on
    #[arg(long, default_value = "ForceRestart")]
    pub reset_type: ResetType,

    /// Seconds to wait for the reboot and settings commit
    #[arg(long, default_value_t = 1800)]
    pub timeout: u64,
}

pub async fn run_boot_order(engine: &HostEngine, args: BootOrderArgs) -> Result<()> {
    let policy = args.reset_type.map(|reset_type| ApplyPolicy {
        reset_type,
        timeout: Duration::from_secs(args.timeout),
    });
    locked(engine, engine.validate_and_apply_boot_order(&args.ids, policy)).await?;
    match policy {
        Some(_) => println!("Boot order applied"),
        None => println!("Boot order is pending until the next reboot"),
    }
    Ok(())
}

pub async fn run_bios(engine: &HostEngine, args: BiosArgs) -> Result<()> {
    let attributes = parse_attributes(&args.attributes)?;
    let policy = ApplyPolicy {
        reset_type: args.reset_type,
        timeout: Duration::from_secs(args.timeout),
    };
    locked(engine, engine.apply_bios_attributes(attributes, policy)).await?;
    println!("BIOS attributes applied");
    Ok(())
}

fn parse_attributes(pairs: &[String]) -> Result<Map<String, Value>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| eyre!("Expected KEY=VALUE, got '{}'", pair))?;
            let value = raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(raw));
            Ok((key.to_string(), value))
        })
        .collect()
}
