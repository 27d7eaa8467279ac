use crate::domain::model::{RecordFormat, StatusRecord, WorldStatus};
use crate::domain::ports::StatusSink;
use chrono::{DateTime, Duration, Utc};

/// In-memory view of what has been published. Lives as long as the process.
#[derive(Debug, Default, Clone)]
pub struct WorldState {
    current: Option<WorldStatus>,
    last_updated: Option<DateTime<Utc>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<WorldStatus> {
        self.current
    }

    /// Returns a timestamp strictly after the previous one.
    fn stamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.last_updated {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        };
        self.last_updated = Some(at);
        at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Status equals the last known value, nothing written.
    Unchanged,
    Written(StatusRecord),
    /// The sink rejected the write. The in-memory status still moved.
    WriteFailed(StatusRecord),
}

/// Single writer of the world status.
pub struct StatusPublisher<S: StatusSink> {
    sink: S,
    format: RecordFormat,
    state: WorldState,
}

impl<S: StatusSink> StatusPublisher<S> {
    pub fn new(sink: S, format: RecordFormat) -> Self {
        Self {
            sink,
            format,
            state: WorldState::new(),
        }
    }

    pub fn current(&self) -> Option<WorldStatus> {
        self.state.current()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Writes only on a transition.
    pub async fn publish(&mut self, status: WorldStatus) -> PublishOutcome {
        if self.state.current == Some(status) {
            tracing::debug!("Status unchanged ({}), skipping write", status);
            return PublishOutcome::Unchanged;
        }

        tracing::info!(
            "🔄 World status changed: {} -> {}",
            self.state
                .current
                .map(|s| s.as_str())
                .unwrap_or("unknown"),
            status
        );
        self.state.current = Some(status);
        self.write(status).await
    }

    /// Writes every time, whatever the previous status was.
    pub async fn publish_unconditionally(&mut self, status: WorldStatus) -> PublishOutcome {
        self.state.current = Some(status);
        self.write(status).await
    }

    async fn write(&mut self, status: WorldStatus) -> PublishOutcome {
        let record = StatusRecord::new(status, self.state.stamp(Utc::now()));

        let document = match self.format.render(&record) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("❌ Failed to serialize status record: {}", e);
                return PublishOutcome::WriteFailed(record);
            }
        };

        match self.sink.write_status(&record, &document).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Published {} - {} to {}",
                    record.status,
                    record.message,
                    self.sink.describe()
                );
                PublishOutcome::Written(record)
            }
            Err(e) => {
                tracing::error!(
                    "❌ Failed to publish {} to {}: {}",
                    record.status,
                    self.sink.describe(),
                    e
                );
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                PublishOutcome::WriteFailed(record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{Result, SyncError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockSink {
        writes: Arc<Mutex<Vec<(StatusRecord, String)>>>,
        failing: Arc<AtomicBool>,
    }

    impl MockSink {
        fn writes(&self) -> Vec<(StatusRecord, String)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl StatusSink for MockSink {
        async fn write_status(&self, record: &StatusRecord, document: &str) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::SinkError {
                    message: "boom".to_string(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((record.clone(), document.to_string()));
            Ok(())
        }

        fn describe(&self) -> String {
            "mock".to_string()
        }
    }

    #[tokio::test]
    async fn test_same_status_twice_writes_once() {
        let sink = MockSink::default();
        let mut publisher = StatusPublisher::new(sink.clone(), RecordFormat::Detailed);

        assert!(matches!(
            publisher.publish(WorldStatus::Open).await,
            PublishOutcome::Written(_)
        ));
        assert_eq!(
            publisher.publish(WorldStatus::Open).await,
            PublishOutcome::Unchanged
        );
        assert_eq!(sink.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_transitions_have_increasing_timestamps() {
        let sink = MockSink::default();
        let mut publisher = StatusPublisher::new(sink.clone(), RecordFormat::Detailed);

        publisher.publish(WorldStatus::Closed).await;
        publisher.publish(WorldStatus::Maintenance).await;
        publisher.publish(WorldStatus::Open).await;

        let writes = sink.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[1].0.status, WorldStatus::Maintenance);
        assert_eq!(writes[2].0.status, WorldStatus::Open);
        for pair in writes.windows(2) {
            assert!(pair[1].0.timestamp > pair[0].0.timestamp);
            assert!(pair[1].0.last_updated > pair[0].0.last_updated);
        }
    }

    #[tokio::test]
    async fn test_failed_write_keeps_new_status() {
        let sink = MockSink::default();
        let mut publisher = StatusPublisher::new(sink.clone(), RecordFormat::Detailed);

        sink.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            publisher.publish(WorldStatus::Maintenance).await,
            PublishOutcome::WriteFailed(_)
        ));
        assert_eq!(publisher.current(), Some(WorldStatus::Maintenance));

        // Next cycle compares against the unsaved value, so nothing is retried.
        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(
            publisher.publish(WorldStatus::Maintenance).await,
            PublishOutcome::Unchanged
        );
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_unconditional_publish_always_writes() {
        let sink = MockSink::default();
        let mut publisher = StatusPublisher::new(sink.clone(), RecordFormat::Compact);

        publisher.publish_unconditionally(WorldStatus::Maintenance).await;
        publisher.publish_unconditionally(WorldStatus::Maintenance).await;

        let writes = sink.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, r#"{"status":"メンテ中"}"#);
    }

    #[test]
    fn test_stamp_is_strictly_monotonic() {
        let mut state = WorldState::new();
        let now = Utc::now();
        let first = state.stamp(now);
        let second = state.stamp(now);
        let third = state.stamp(now - Duration::seconds(5));
        assert!(second > first);
        assert!(third > second);
    }
}
