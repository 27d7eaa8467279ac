//! Poll loop for the short-lived remote-console transport.
//!
//! Each tick spawns an independent cycle task (connect, probe, disconnect) so a
//! slow server never delays the next tick. Results come back through a
//! `JoinSet` to the loop, which is the only writer of the world state.

use crate::config::StaleResponsePolicy;
use crate::core::classifier::classify_session;
use crate::core::command::ProbeCommands;
use crate::core::publisher::{PublishOutcome, StatusPublisher};
use crate::core::scheduler::PollScheduler;
use crate::domain::model::{Hypothesis, WorldStatus};
use crate::domain::ports::{ConsoleConnector, ConsoleSession, StatusSink};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

/// One probe cycle. A session that cannot be opened reads as `Closed`.
pub async fn probe_world<C: ConsoleConnector + ?Sized>(
    connector: &C,
    probes: &ProbeCommands,
) -> WorldStatus {
    match connector.connect().await {
        Ok(mut session) => {
            let status = classify_session(&mut session, probes).await;
            if let Err(e) = session.end().await {
                tracing::debug!("Error while closing console session: {}", e);
            }
            status
        }
        Err(e) => {
            tracing::error!("❌ Remote console connection failed: {}", e);
            WorldStatus::Closed
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RconMonitorSettings {
    /// Rewrite the sink every cycle instead of only on change.
    pub write_every_cycle: bool,
    pub stale_responses: StaleResponsePolicy,
}

pub struct RconMonitor<C: ConsoleConnector + 'static, S: StatusSink> {
    connector: Arc<C>,
    probes: Arc<ProbeCommands>,
    scheduler: PollScheduler,
    publisher: StatusPublisher<S>,
    settings: RconMonitorSettings,
    latest_applied: u64,
}

impl<C: ConsoleConnector + 'static, S: StatusSink> RconMonitor<C, S> {
    pub fn new(
        connector: C,
        probes: ProbeCommands,
        scheduler: PollScheduler,
        publisher: StatusPublisher<S>,
        settings: RconMonitorSettings,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            probes: Arc::new(probes),
            scheduler,
            publisher,
            settings,
            latest_applied: 0,
        }
    }

    pub fn publisher(&self) -> &StatusPublisher<S> {
        &self.publisher
    }

    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) -> Self {
        tokio::pin!(shutdown);

        let mut cycles: JoinSet<(u64, WorldStatus)> = JoinSet::new();
        let mut next_cycle = 0u64;

        tracing::info!(
            "👀 Watching {} every {:?} via remote console",
            self.probes.scoreboard_test(Hypothesis::Maintenance),
            self.scheduler.period()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested, stopping remote console monitor");
                    break;
                }
                _ = self.scheduler.tick() => {
                    next_cycle += 1;
                    let cycle = next_cycle;
                    let connector = Arc::clone(&self.connector);
                    let probes = Arc::clone(&self.probes);
                    cycles.spawn(async move {
                        let status = probe_world(connector.as_ref(), probes.as_ref()).await;
                        (cycle, status)
                    });
                }
                Some(joined) = cycles.join_next() => match joined {
                    Ok((cycle, status)) => {
                        self.apply(cycle, status).await;
                    }
                    Err(e) => tracing::error!("❌ Poll cycle task failed: {}", e),
                },
            }
        }

        cycles.abort_all();
        self
    }

    /// Publishes the result of `cycle`.
    pub async fn apply(&mut self, cycle: u64, status: WorldStatus) -> Option<PublishOutcome> {
        if cycle < self.latest_applied
            && self.settings.stale_responses == StaleResponsePolicy::Ignore
        {
            tracing::debug!(
                "Dropping result of cycle {} (cycle {} already applied)",
                cycle,
                self.latest_applied
            );
            return None;
        }
        self.latest_applied = self.latest_applied.max(cycle);

        let outcome = if self.settings.write_every_cycle {
            self.publisher.publish_unconditionally(status).await
        } else {
            self.publisher.publish(status).await
        };
        Some(outcome)
    }
}
