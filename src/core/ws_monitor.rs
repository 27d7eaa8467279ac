//! Poll loop for the persistent WebSocket transport.
//!
//! Everything runs inside one `select!` loop that owns the transport, the
//! pending probe map and the publisher. Handlers run to completion between
//! I/O waits, so the world state has a single writer and needs no lock. Sink
//! writes are awaited in the loop and therefore happen one at a time.

use crate::adapters::websocket::WsTransport;
use crate::config::StaleResponsePolicy;
use crate::core::classifier::{
    classify_probe_answer, classify_status_message, parse_inbound, Inbound, ProbeAnswer,
};
use crate::core::command::{new_request_id, CommandRequest, PendingRequests, ProbeCommands};
use crate::core::publisher::{PublishOutcome, StatusPublisher};
use crate::core::scheduler::PollScheduler;
use crate::domain::model::{Hypothesis, WorldStatus};
use crate::domain::ports::StatusSink;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

#[derive(Debug, Clone)]
pub struct WsMonitorSettings {
    /// Gap between the open probe and the maintenance probe.
    pub stagger: Duration,
    pub stale_responses: StaleResponsePolicy,
}

impl Default for WsMonitorSettings {
    fn default() -> Self {
        Self {
            stagger: Duration::from_secs(1),
            stale_responses: StaleResponsePolicy::default(),
        }
    }
}

pub struct WsMonitor<S: StatusSink> {
    transport: WsTransport,
    scheduler: PollScheduler,
    probes: ProbeCommands,
    pending: PendingRequests,
    publisher: StatusPublisher<S>,
    settings: WsMonitorSettings,
    staggered_probe_at: Option<Instant>,
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<S: StatusSink> WsMonitor<S> {
    pub fn new(
        transport: WsTransport,
        scheduler: PollScheduler,
        probes: ProbeCommands,
        publisher: StatusPublisher<S>,
        settings: WsMonitorSettings,
    ) -> Self {
        Self {
            transport,
            scheduler,
            probes,
            pending: PendingRequests::new(),
            publisher,
            settings,
            staggered_probe_at: None,
        }
    }

    pub fn publisher(&self) -> &StatusPublisher<S> {
        &self.publisher
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn transport(&self) -> &WsTransport {
        &self.transport
    }

    /// Runs until `shutdown` resolves, then hands the monitor back.
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) -> Self {
        tokio::pin!(shutdown);

        tracing::info!(
            "👀 Watching {} every {:?} via {}",
            self.probes.testfor(Hypothesis::Open),
            self.scheduler.period(),
            self.transport.url()
        );
        self.transport.connect().await;

        loop {
            let reconnect_at = self.transport.reconnect_at();
            let staggered_probe_at = self.staggered_probe_at;

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested, stopping WebSocket monitor");
                    break;
                }
                _ = self.scheduler.tick() => self.start_cycle().await,
                _ = sleep_until_opt(staggered_probe_at) => {
                    self.staggered_probe_at = None;
                    self.send_probe(Hypothesis::Maintenance).await;
                }
                _ = sleep_until_opt(reconnect_at) => self.transport.connect().await,
                frame = self.transport.next_frame() => {
                    if let Some(raw) = frame {
                        self.handle_frame(&raw).await;
                    }
                }
            }
        }

        self
    }

    /// Opens a new cycle: forgets unanswered probes, sends the open probe now
    /// and schedules the maintenance probe after the stagger delay.
    pub async fn start_cycle(&mut self) {
        let cycle = self.pending.begin_cycle();
        tracing::debug!("Poll cycle {} started", cycle);

        self.send_probe(Hypothesis::Open).await;
        self.staggered_probe_at = Some(Instant::now() + self.settings.stagger);
    }

    async fn send_probe(&mut self, hypothesis: Hypothesis) {
        let request_id = new_request_id();
        let command = self.probes.testfor(hypothesis);

        let payload = match CommandRequest::new(request_id.as_str(), command.as_str()).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("❌ Failed to encode probe '{}': {}", command, e);
                return;
            }
        };

        if self.transport.send(payload).await {
            tracing::debug!("Sent probe {} ({})", request_id, command);
            self.pending.register(request_id, hypothesis);
        }
    }

    /// Classifies one inbound frame and publishes the result. `None` when the
    /// frame carried no usable status.
    pub async fn handle_frame(&mut self, raw: &str) -> Option<PublishOutcome> {
        let inbound = match parse_inbound(raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("⚠️ Ignoring unparsable frame: {}", e);
                return None;
            }
        };

        let (request_id, status_message) = match inbound {
            Inbound::CommandResponse {
                request_id,
                status_message,
            } => (request_id, status_message),
            Inbound::Ignored => return None,
        };

        let hypothesis = request_id
            .as_deref()
            .and_then(|id| self.pending.resolve(id));

        let status = match hypothesis {
            Some(hypothesis) => match classify_probe_answer(&status_message, hypothesis) {
                ProbeAnswer::Held(status) => {
                    self.pending.record_held();
                    status
                }
                ProbeAnswer::Missed => {
                    if !self.pending.record_missed(hypothesis) {
                        tracing::debug!(
                            "Probe {:?} missed in cycle {}, waiting for the rest",
                            hypothesis,
                            self.pending.cycle()
                        );
                        return None;
                    }
                    WorldStatus::Closed
                }
                ProbeAnswer::Unrecognized => {
                    tracing::debug!("No status in response: {}", status_message);
                    return None;
                }
            },
            None if self.settings.stale_responses == StaleResponsePolicy::Ignore => {
                tracing::debug!(
                    "Ignoring response {:?} outside cycle {}",
                    request_id,
                    self.pending.cycle()
                );
                return None;
            }
            None => match classify_status_message(&status_message) {
                Some(status) => status,
                None => {
                    tracing::debug!("No status in response: {}", status_message);
                    return None;
                }
            },
        };

        Some(self.publisher.publish(status).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::ReconnectPolicy;
    use crate::domain::model::{RecordFormat, StatusRecord, WorldStatus};
    use crate::utils::error::Result;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        documents: Arc<Mutex<Vec<String>>>,
    }

    impl StatusSink for RecordingSink {
        async fn write_status(&self, _record: &StatusRecord, document: &str) -> Result<()> {
            self.documents.lock().unwrap().push(document.to_string());
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    fn monitor(sink: RecordingSink, stale: StaleResponsePolicy) -> WsMonitor<RecordingSink> {
        WsMonitor::new(
            WsTransport::new(
                "ws://127.0.0.1:9",
                ReconnectPolicy::default(),
                Duration::from_secs(1),
            ),
            PollScheduler::new(Duration::from_secs(60)),
            ProbeCommands::new("Bananakundao", "mente"),
            StatusPublisher::new(sink, RecordFormat::Detailed),
            WsMonitorSettings {
                stagger: Duration::from_secs(1),
                stale_responses: stale,
            },
        )
    }

    fn response(request_id: &str, status_message: &str) -> String {
        serde_json::json!({
            "header": {
                "requestId": request_id,
                "messagePurpose": "commandResponse",
                "version": 1
            },
            "body": { "statusCode": 0, "statusMessage": status_message }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_no_targets_matched_publishes_closed_record() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        monitor
            .handle_frame(&response("x", "No targets matched"))
            .await;

        let documents = sink.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&documents[0]).unwrap();
        assert_eq!(json["status"], "closed");
        assert_eq!(json["message"], "ワールドは未開放です");
        assert!(json["lastUpdated"].is_string());
        assert!(json["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_repeated_response_writes_once() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        let first = monitor.handle_frame(&response("a", "Found 1, score=1")).await;
        let second = monitor.handle_frame(&response("b", "Found 1, score=1")).await;

        assert!(matches!(first, Some(PublishOutcome::Written(_))));
        assert_eq!(second, Some(PublishOutcome::Unchanged));
        assert_eq!(sink.documents.lock().unwrap().len(), 1);
        assert_eq!(monitor.publisher().current(), Some(WorldStatus::Maintenance));
    }

    #[tokio::test]
    async fn test_garbage_and_events_are_ignored() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        assert!(monitor.handle_frame("{not json").await.is_none());
        assert!(monitor
            .handle_frame(r#"{"header":{"messagePurpose":"event"},"body":{"eventName":"PlayerMessage"}}"#)
            .await
            .is_none());
        assert!(monitor.handle_frame(&response("a", "Syntax error")).await.is_none());
        assert!(sink.documents.lock().unwrap().is_empty());
        assert_eq!(monitor.publisher().current(), None);
    }

    #[tokio::test]
    async fn test_stale_responses_can_be_ignored() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Ignore);

        assert!(monitor
            .handle_frame(&response("from-old-cycle", "No targets matched"))
            .await
            .is_none());

        monitor.pending.begin_cycle();
        monitor
            .pending
            .register("current".to_string(), Hypothesis::Open);
        let outcome = monitor
            .handle_frame(&response("current", "Found Bananakundao"))
            .await;

        assert!(matches!(outcome, Some(PublishOutcome::Written(_))));
        assert_eq!(monitor.publisher().current(), Some(WorldStatus::Open));
        assert!(monitor.pending().is_empty());
    }

    fn register_cycle(monitor: &mut WsMonitor<RecordingSink>) {
        monitor.pending.begin_cycle();
        monitor.pending.register("open".to_string(), Hypothesis::Open);
        monitor
            .pending
            .register("mente".to_string(), Hypothesis::Maintenance);
    }

    #[tokio::test]
    async fn test_one_missed_probe_does_not_close_an_open_world() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        for _ in 0..3 {
            register_cycle(&mut monitor);
            monitor
                .handle_frame(&response("open", "Found Bananakundao"))
                .await;
            let missed = monitor
                .handle_frame(&response("mente", "No targets matched selector"))
                .await;
            assert!(missed.is_none());
        }

        assert_eq!(monitor.publisher().current(), Some(WorldStatus::Open));
        assert_eq!(sink.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_maintenance_answer_after_open_miss() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        register_cycle(&mut monitor);
        assert!(monitor
            .handle_frame(&response("open", "No targets matched selector"))
            .await
            .is_none());
        let outcome = monitor
            .handle_frame(&response("mente", "Found Bananakundao"))
            .await;

        assert!(matches!(outcome, Some(PublishOutcome::Written(_))));
        assert_eq!(monitor.publisher().current(), Some(WorldStatus::Maintenance));
    }

    #[tokio::test]
    async fn test_both_probes_missed_closes_world_once() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink.clone(), StaleResponsePolicy::Classify);

        for _ in 0..2 {
            register_cycle(&mut monitor);
            assert!(monitor
                .handle_frame(&response("open", "No targets matched selector"))
                .await
                .is_none());
            assert!(monitor
                .handle_frame(&response("mente", "No targets matched selector"))
                .await
                .is_some());
        }

        assert_eq!(monitor.publisher().current(), Some(WorldStatus::Closed));
        assert_eq!(sink.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_while_disconnected_sends_nothing() {
        let sink = RecordingSink::default();
        let mut monitor = monitor(sink, StaleResponsePolicy::Classify);

        monitor.start_cycle().await;

        assert_eq!(monitor.pending().cycle(), 1);
        assert!(monitor.pending().is_empty());
        assert!(monitor.staggered_probe_at.is_some());
    }
}
