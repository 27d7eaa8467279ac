use crate::adapters::{GitHubSink, GitHubTarget, LocalFileSink, RconConnector, WsTransport};
use crate::config::{AppConfig, SinkKind, TransportMode};
use crate::core::command::ProbeCommands;
use crate::core::publisher::StatusPublisher;
use crate::core::rcon_monitor::{RconMonitor, RconMonitorSettings};
use crate::core::scheduler::PollScheduler;
use crate::core::ws_monitor::{WsMonitor, WsMonitorSettings};
use crate::domain::ports::StatusSink;
use crate::utils::error::{Result, SyncError};
use std::future::Future;

/// Wires the configured transport and sink together and runs the poll loop.
pub struct SyncEngine {
    config: AppConfig,
}

impl SyncEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Builds the sink, then polls until `shutdown` resolves. Only sink
    /// construction can fail; runtime failures are logged inside the loop.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> Result<()> {
        match self.config.sink.r#type {
            SinkKind::File => {
                let sink = LocalFileSink::new(self.config.sink_path());
                self.run_with_sink(sink, shutdown).await;
            }
            SinkKind::Github => {
                let sink = GitHubSink::new(self.github_target()?, self.config.request_timeout())?;
                self.run_with_sink(sink, shutdown).await;
            }
        }
        Ok(())
    }

    fn github_target(&self) -> Result<GitHubTarget> {
        let github = self
            .config
            .sink
            .github
            .as_ref()
            .ok_or_else(|| SyncError::MissingConfigError {
                field: "sink.github".to_string(),
            })?;
        let token = self
            .config
            .github_token()
            .ok_or_else(|| SyncError::MissingConfigError {
                field: "sink.github.token".to_string(),
            })?;

        Ok(GitHubTarget {
            api_url: self.config.github_api_url().to_string(),
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            path: self.config.sink_path().to_string(),
            branch: github.branch.clone(),
            token,
        })
    }

    async fn run_with_sink<S, F>(&self, sink: S, shutdown: F)
    where
        S: StatusSink,
        F: Future<Output = ()>,
    {
        let config = &self.config;
        let publisher = StatusPublisher::new(sink, config.record_format());
        let probes = ProbeCommands::new(config.entity(), config.objective());
        let scheduler = PollScheduler::new(config.poll_interval());

        match config.mode() {
            TransportMode::Websocket => {
                let transport = WsTransport::new(
                    config.websocket_url(),
                    config.reconnect_policy(),
                    config.request_timeout(),
                );
                let settings = WsMonitorSettings {
                    stagger: config.stagger_delay(),
                    stale_responses: config.stale_responses(),
                };
                WsMonitor::new(transport, scheduler, probes, publisher, settings)
                    .run_until(shutdown)
                    .await;
            }
            TransportMode::Rcon => {
                let connector = RconConnector::new(
                    &config.server.host,
                    config.server.port,
                    config.server.password.clone(),
                    config.request_timeout(),
                );
                let settings = RconMonitorSettings {
                    write_every_cycle: config.write_every_cycle(),
                    stale_responses: config.stale_responses(),
                };
                RconMonitor::new(connector, probes, scheduler, publisher, settings)
                    .run_until(shutdown)
                    .await;
            }
        }
    }
}
