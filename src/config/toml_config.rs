use crate::core::scheduler::ReconnectPolicy;
use crate::domain::model::RecordFormat;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENTITY: &str = "Bananakundao";
pub const DEFAULT_OBJECTIVE: &str = "mente";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Persistent WebSocket command channel, publishes on change.
    #[default]
    Websocket,
    /// Short remote-console session per cycle.
    Rcon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Github,
    File,
}

/// What to do with a response whose correlation id is not part of the
/// current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleResponsePolicy {
    /// Classify it on its text alone, like any other response.
    #[default]
    Classify,
    /// Drop it.
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: TransportMode,
    pub host: String,
    pub port: u32,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub entity: Option<String>,
    pub objective: Option<String>,
    pub stagger_millis: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub interval_seconds: Option<u64>,
    pub reconnect_delay_seconds: Option<u64>,
    pub max_reconnect_delay_seconds: Option<u64>,
    pub reconnect_multiplier: Option<f64>,
    pub request_timeout_seconds: Option<u64>,
    pub stale_responses: Option<StaleResponsePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub r#type: SinkKind,
    pub path: Option<String>,
    pub format: Option<RecordFormat>,
    pub write_every_cycle: Option<bool>,
    pub github: Option<GitHubConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    pub branch: Option<String>,
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Loads and parses a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn mode(&self) -> TransportMode {
        self.server.mode
    }

    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}", self.server.host, self.server.port)
    }

    pub fn entity(&self) -> &str {
        self.probe.entity.as_deref().unwrap_or(DEFAULT_ENTITY)
    }

    pub fn objective(&self) -> &str {
        self.probe.objective.as_deref().unwrap_or(DEFAULT_OBJECTIVE)
    }

    pub fn stagger_delay(&self) -> Duration {
        Duration::from_millis(self.probe.stagger_millis.unwrap_or(1000))
    }

    /// 60s for the WebSocket mode, 5s for RCON unless configured.
    pub fn poll_interval(&self) -> Duration {
        let default = match self.mode() {
            TransportMode::Websocket => 60,
            TransportMode::Rcon => 5,
        };
        Duration::from_secs(self.schedule.interval_seconds.unwrap_or(default))
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let base = self.schedule.reconnect_delay_seconds.unwrap_or(30);
        let max = self
            .schedule
            .max_reconnect_delay_seconds
            .unwrap_or(base)
            .max(base);
        ReconnectPolicy {
            base_delay: Duration::from_secs(base),
            max_delay: Duration::from_secs(max),
            multiplier: self.schedule.reconnect_multiplier.unwrap_or(2.0),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.schedule.request_timeout_seconds.unwrap_or(10))
    }

    pub fn stale_responses(&self) -> StaleResponsePolicy {
        self.schedule.stale_responses.unwrap_or_default()
    }

    pub fn sink_path(&self) -> &str {
        self.sink.path.as_deref().unwrap_or("open.json")
    }

    pub fn record_format(&self) -> RecordFormat {
        self.sink.format.unwrap_or(match self.mode() {
            TransportMode::Websocket => RecordFormat::Detailed,
            TransportMode::Rcon => RecordFormat::Compact,
        })
    }

    /// RCON mode rewrites the sink every cycle unless told otherwise.
    pub fn write_every_cycle(&self) -> bool {
        self.sink
            .write_every_cycle
            .unwrap_or(self.mode() == TransportMode::Rcon)
    }

    pub fn github_api_url(&self) -> &str {
        self.sink
            .github
            .as_ref()
            .and_then(|g| g.api_url.as_deref())
            .unwrap_or(DEFAULT_GITHUB_API)
    }

    /// Token from the file, falling back to `GITHUB_TOKEN`. An unresolved
    /// `${VAR}` placeholder counts as missing.
    pub fn github_token(&self) -> Option<String> {
        let configured = self
            .sink
            .github
            .as_ref()
            .and_then(|g| g.token.clone())
            .filter(|t| !t.trim().is_empty() && !t.starts_with("${"));

        configured.or_else(|| {
            std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_range("server.port", self.server.port, 1, 65535)?;

        validation::validate_command_token("probe.entity", self.entity())?;
        validation::validate_command_token("probe.objective", self.objective())?;

        validation::validate_non_zero_duration("schedule.interval_seconds", self.poll_interval())?;
        validation::validate_non_zero_duration(
            "schedule.reconnect_delay_seconds",
            self.reconnect_policy().base_delay,
        )?;
        validation::validate_non_zero_duration(
            "schedule.request_timeout_seconds",
            self.request_timeout(),
        )?;
        if self.mode() == TransportMode::Websocket && self.stagger_delay() >= self.poll_interval() {
            return Err(SyncError::InvalidConfigValueError {
                field: "probe.stagger_millis".to_string(),
                value: self.stagger_delay().as_millis().to_string(),
                reason: format!(
                    "Must be shorter than the poll interval ({} ms)",
                    self.poll_interval().as_millis()
                ),
            });
        }
        if let Some(multiplier) = self.schedule.reconnect_multiplier {
            validation::validate_range("schedule.reconnect_multiplier", multiplier, 1.0, 10.0)?;
        }

        validation::validate_document_path("sink.path", self.sink_path())?;

        if self.sink.r#type == SinkKind::Github {
            let github = validation::validate_required_field("sink.github", &self.sink.github)?;
            validation::validate_non_empty_string("sink.github.owner", &github.owner)?;
            validation::validate_non_empty_string("sink.github.repo", &github.repo)?;
            validation::validate_api_base_url("sink.github.api_url", self.github_api_url())?;
            validation::validate_required_field("sink.github.token", &self.github_token())?;
        }

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
