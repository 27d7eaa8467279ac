use clap::Parser;
use world_status_sync::config::{LogFormat, SinkKind, TransportMode};
use world_status_sync::utils::{logger, validation::Validate};
use world_status_sync::{AppConfig, CliArgs, SyncEngine};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }
    logger::install_panic_hook();

    tracing::info!("🚀 Starting world-status-sync");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Some(mode) = args.mode {
        config.server.mode = mode;
        tracing::info!("🔧 Transport mode overridden to: {:?}", mode);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - not connecting to the game server");
        return Ok(());
    }

    let engine = SyncEngine::new(config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = engine.run_until(shutdown).await {
        tracing::error!(
            "❌ Failed to start: {} (Severity: {:?})",
            e,
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    tracing::info!("👋 world-status-sync stopped");
    Ok(())
}

fn display_config_summary(config: &AppConfig) {
    println!("📋 Configuration Summary:");
    match config.mode() {
        TransportMode::Websocket => println!("  Transport: WebSocket {}", config.websocket_url()),
        TransportMode::Rcon => println!(
            "  Transport: RCON {}:{} (password: {})",
            config.server.host,
            config.server.port,
            if config.server.password.is_some() { "set" } else { "none" }
        ),
    }
    println!(
        "  Probe: entity={} objective={}",
        config.entity(),
        config.objective()
    );
    println!("  Interval: {:?}", config.poll_interval());
    match config.sink.r#type {
        SinkKind::File => println!("  Sink: file {}", config.sink_path()),
        SinkKind::Github => {
            if let Some(github) = &config.sink.github {
                println!(
                    "  Sink: github {}/{}:{}",
                    github.owner,
                    github.repo,
                    config.sink_path()
                );
            }
        }
    }
    println!(
        "  Format: {:?}, write every cycle: {}",
        config.record_format(),
        config.write_every_cycle()
    );
    println!();
}
