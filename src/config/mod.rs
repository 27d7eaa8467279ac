pub mod toml_config;

pub use toml_config::{AppConfig, SinkKind, StaleResponsePolicy, TransportMode};

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "world-status-sync")]
#[command(about = "Mirrors a game server's world status into a JSON file or GitHub repository")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "world-status.toml")]
    pub config: String,

    /// Override the transport mode from config
    #[arg(long, value_enum)]
    pub mode: Option<TransportMode>,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and print a summary without connecting
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::parse_from(["world-status-sync"]);
        assert_eq!(args.config, "world-status.toml");
        assert_eq!(args.log_format, LogFormat::Compact);
        assert!(args.mode.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::parse_from([
            "world-status-sync",
            "--config",
            "/etc/wss.toml",
            "--mode",
            "rcon",
            "--log-format",
            "json",
            "-v",
        ]);
        assert_eq!(args.config, "/etc/wss.toml");
        assert_eq!(args.mode, Some(TransportMode::Rcon));
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.verbose);
    }
}
