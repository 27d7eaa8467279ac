use crate::domain::model::Hypothesis;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Formats the scoreboard probes for one entity/objective pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommands {
    entity: String,
    objective: String,
}

impl ProbeCommands {
    pub fn new(entity: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            objective: objective.into(),
        }
    }

    /// Selector form used over the WebSocket command channel.
    pub fn testfor(&self, hypothesis: Hypothesis) -> String {
        format!(
            "testfor @e[name={},scores={{{}={}}}]",
            self.entity,
            self.objective,
            hypothesis.score()
        )
    }

    /// Scoreboard form used over the remote console.
    pub fn scoreboard_test(&self, hypothesis: Hypothesis) -> String {
        format!(
            "scoreboard players test {} {} {}",
            self.entity,
            self.objective,
            hypothesis.score()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    pub request_id: String,
    pub message_purpose: String,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOrigin {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBody {
    pub origin: CommandOrigin,
    pub command_line: String,
    pub version: u32,
}

/// Outbound `commandRequest` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub header: RequestHeader,
    pub body: CommandBody,
}

impl CommandRequest {
    pub fn new(request_id: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            header: RequestHeader {
                request_id: request_id.into(),
                message_purpose: "commandRequest".to_string(),
                version: 1,
            },
            body: CommandBody {
                origin: CommandOrigin {
                    kind: "player".to_string(),
                },
                command_line: command_line.into(),
                version: 1,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Probes sent during the current poll cycle, keyed by correlation id,
/// plus what their answers have ruled out so far.
#[derive(Debug, Default)]
pub struct PendingRequests {
    cycle: u64,
    requests: HashMap<String, Hypothesis>,
    missed: HashSet<Hypothesis>,
    held: bool,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every probe from the previous cycle.
    pub fn begin_cycle(&mut self) -> u64 {
        if !self.requests.is_empty() {
            tracing::debug!(
                "Dropping {} unanswered probe(s) from cycle {}",
                self.requests.len(),
                self.cycle
            );
        }
        self.requests.clear();
        self.missed.clear();
        self.held = false;
        self.cycle += 1;
        self.cycle
    }

    pub fn register(&mut self, request_id: String, hypothesis: Hypothesis) {
        self.requests.insert(request_id, hypothesis);
    }

    /// Removes and returns the hypothesis for a response, `None` if the id is
    /// unknown (late answer from an earlier cycle, or no id at all).
    pub fn resolve(&mut self, request_id: &str) -> Option<Hypothesis> {
        self.requests.remove(request_id)
    }

    /// A probe of this cycle matched.
    pub fn record_held(&mut self) {
        self.held = true;
    }

    /// A probe of this cycle matched nothing. Returns `true` once every
    /// hypothesis has been ruled out and none held.
    pub fn record_missed(&mut self, hypothesis: Hypothesis) -> bool {
        self.missed.insert(hypothesis);
        !self.held && Hypothesis::ALL.iter().all(|h| self.missed.contains(h))
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
