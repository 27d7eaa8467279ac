use anyhow::{Context, Result};
use clap::Parser;
use world_status_sync::core::command::ProbeCommands;
use world_status_sync::core::rcon_monitor::probe_world;
use world_status_sync::utils::{logger, validation::Validate};
use world_status_sync::{AppConfig, RconConnector};

#[derive(Parser)]
#[command(name = "probe_once")]
#[command(about = "Runs one remote-console probe cycle and prints the world status")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "world-status.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    config.validate().context("validating configuration")?;

    let connector = RconConnector::new(
        &config.server.host,
        config.server.port,
        config.server.password.clone(),
        config.request_timeout(),
    );
    let probes = ProbeCommands::new(config.entity(), config.objective());

    println!("🔌 Probing {}", connector.address());
    let status = probe_world(&connector, &probes).await;
    println!("🌍 {} ({})", status, status.message());

    Ok(())
}
