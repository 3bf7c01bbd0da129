// bmcwarden: drive a Redfish-managed host to a desired state and wait for it
use std::io::stderr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;
mod config;

use cmd::ConnectionArgs;
use config::FileConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Redfish host state reconciliation", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// YAML file with controller ids and polling overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output - shows per-poll logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show power state and whether the host is in POST
    Status,
    /// Power the host on or off and wait until it gets there
    Power(cmd::power::PowerArgs),
    /// Issue a reset action and wait for its outcome
    Reset(cmd::power::ResetArgs),
    /// Write a new boot order and optionally reboot to apply it
    BootOrder(cmd::settings::BootOrderArgs),
    /// Write BIOS attributes and reboot to apply them
    Bios(cmd::settings::BiosArgs),
    /// Asynchronous controller tasks
    #[command(subcommand)]
    Task(cmd::task::TaskCommand),
    /// Storage volumes
    #[command(subcommand)]
    Volume(cmd::volume::VolumeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "bmcwarden={level},bmcwarden_bmc={level},reqwest=warn,hyper=warn,rustls=warn,h2=warn",
        level = level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry().with(filter).with(fmt::layer().with_writer(stderr)).init();

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    debug!(timing = ?file_config.timing, "Configuration loaded");

    let engine = cmd::connect(&cli.connection, &file_config).await?;

    let result = match cli.command {
        Commands::Status => cmd::power::run_status(&engine).await,
        Commands::Power(args) => cmd::power::run_power(&engine, args).await,
        Commands::Reset(args) => cmd::power::run_reset(&engine, args).await,
        Commands::BootOrder(args) => cmd::settings::run_boot_order(&engine, args).await,
        Commands::Bios(args) => cmd::settings::run_bios(&engine, args).await,
        Commands::Task(command) => cmd::task::run(&engine, command).await,
        Commands::Volume(command) => cmd::volume::run(&engine, command).await,
    };

    if let Err(e) = &result {
        error!(endpoint = %engine.endpoint(), "Operation failed: {:#}", e);
    }
    result
}
