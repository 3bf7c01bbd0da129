use std::time::Duration;

use bmcwarden_bmc::HostEngine;
use clap::Subcommand;
use color_eyre::eyre::Result;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Wait for a task to finish; a failed task prints its log
    Wait {
        /// Task URI, as returned in a Location header
        location: String,

        /// Seconds to wait for a terminal state
        #[arg(long, default_value_t = 3600)]
        timeout: u64,
    },
}

pub async fn run(engine: &HostEngine, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Wait { location, timeout } => {
            engine
                .wait_for_task_end(&location, Duration::from_secs(timeout))
                .await?;
            println!("Task {} completed", location);
        }
    }
    Ok(())
}
