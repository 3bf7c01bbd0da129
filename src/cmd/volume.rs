use std::time::Duration;

use bmcwarden_bmc::{HostEngine, VolumeRequest};
use clap::Subcommand;
use color_eyre::eyre::Result;

use super::locked;

#[derive(Subcommand, Debug)]
pub enum VolumeCommand {
    /// Create a volume and wait for the controller job
    Create {
        /// Storage controller id, e.g. RAID.Integrated.1-1
        #[arg(long)]
        controller: String,

        /// Volume name
        #[arg(long)]
        name: String,

        /// Redfish RAIDType, e.g. RAID1
        #[arg(long)]
        raid: String,

        /// Drive URI; repeat for every member drive
        #[arg(long = "drive", required = true)]
        drives: Vec<String>,

        /// Seconds to wait for the job
        #[arg(long, default_value_t = 3600)]
        timeout: u64,
    },
    /// Delete a volume and wait for the controller job
    Delete {
        /// Volume URI
        volume: String,

        /// Seconds to wait for the job
        #[arg(long, default_value_t = 3600)]
        timeout: u64,
    },
}

pub async fn run(engine: &HostEngine, command: VolumeCommand) -> Result<()> {
    match command {
        VolumeCommand::Create {
            controller,
            name,
            raid,
            drives,
            timeout,
        } => {
            let request = drives
                .into_iter()
                .fold(VolumeRequest::new(name, raid), |request, drive| {
                    request.with_drive(drive)
                });
            let timeout = Duration::from_secs(timeout);
            locked(engine, engine.create_volume(&controller, &request, timeout)).await?;
            println!("Volume {} created on {}", request.name, controller);
        }
        VolumeCommand::Delete { volume, timeout } => {
            let timeout = Duration::from_secs(timeout);
            locked(engine, engine.delete_volume(&volume, timeout)).await?;
            println!("Volume {} deleted", volume);
        }
    }
    Ok(())
}
