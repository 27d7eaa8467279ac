use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// World availability as reported by the game server scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldStatus {
    Open,
    Maintenance,
    #[default]
    Closed,
}

impl WorldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorldStatus::Open => "open",
            WorldStatus::Maintenance => "maintenance",
            WorldStatus::Closed => "closed",
        }
    }

    /// Sentence shown on the website.
    pub fn message(&self) -> &'static str {
        match self {
            WorldStatus::Open => "ワールドは開放中です",
            WorldStatus::Maintenance => "ワールドはメンテナンス中です",
            WorldStatus::Closed => "ワールドは未開放です",
        }
    }

    /// Short label used by the compact record format.
    pub fn label(&self) -> &'static str {
        match self {
            WorldStatus::Open => "開放中",
            WorldStatus::Maintenance => "メンテ中",
            WorldStatus::Closed => "未開放",
        }
    }
}

impl fmt::Display for WorldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot written to the status sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: WorldStatus,
    pub message: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
    /// Milliseconds since the unix epoch, same instant as `last_updated`.
    pub timestamp: i64,
}

impl StatusRecord {
    pub fn new(status: WorldStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            message: status.message().to_string(),
            last_updated: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            timestamp: at.timestamp_millis(),
        }
    }
}

/// Layout of the JSON document handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// Full [`StatusRecord`], pretty printed.
    Detailed,
    /// `{"status": "<label>"}` only.
    Compact,
}

#[derive(Serialize)]
struct CompactRecord<'a> {
    status: &'a str,
}

impl RecordFormat {
    pub fn render(&self, record: &StatusRecord) -> serde_json::Result<String> {
        match self {
            RecordFormat::Detailed => serde_json::to_string_pretty(record),
            RecordFormat::Compact => serde_json::to_string(&CompactRecord {
                status: record.status.label(),
            }),
        }
    }
}

/// Which status a probe command tests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hypothesis {
    /// Objective score 0.
    Open,
    /// Objective score 1.
    Maintenance,
}

impl Hypothesis {
    pub const ALL: [Hypothesis; 2] = [Hypothesis::Open, Hypothesis::Maintenance];

    pub fn score(&self) -> u8 {
        match self {
            Hypothesis::Open => 0,
            Hypothesis::Maintenance => 1,
        }
    }

    pub fn status(&self) -> WorldStatus {
        match self {
            Hypothesis::Open => WorldStatus::Open,
            Hypothesis::Maintenance => WorldStatus::Maintenance,
        }
    }
}
