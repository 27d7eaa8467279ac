//! Maps raw probe results onto [`WorldStatus`].
//!
//! Two shapes of evidence exist: the `statusMessage` text of a WebSocket
//! `commandResponse`, and plain success/failure of remote-console probes.

use crate::core::command::ProbeCommands;
use crate::domain::model::{Hypothesis, WorldStatus};
use crate::domain::ports::ConsoleSession;
use crate::utils::error::{Result, SyncError};
use serde::Deserialize;

const NO_MATCH: &str = "No targets matched";
const FOUND: &str = "Found";

/// Console replies that mean the probe did not hold.
const REJECTION_MARKERS: [&str; 5] = ["not in range", "unknown", "no targets", "error", "failed"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundHeader {
    request_id: Option<String>,
    message_purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundBody {
    status_message: Option<String>,
    event_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    header: Option<InboundHeader>,
    body: Option<InboundBody>,
}

/// Decoded inbound WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    CommandResponse {
        request_id: Option<String>,
        status_message: String,
    },
    /// Game events and responses without a status message.
    Ignored,
}

pub fn parse_inbound(raw: &str) -> Result<Inbound> {
    let frame: InboundFrame = serde_json::from_str(raw)?;

    let body = match frame.body {
        Some(body) => body,
        None => return Ok(Inbound::Ignored),
    };

    if body.event_name.as_deref() == Some("PlayerMessage") {
        return Ok(Inbound::Ignored);
    }

    let header = match frame.header {
        Some(header) if header.message_purpose.as_deref() == Some("commandResponse") => header,
        _ => return Ok(Inbound::Ignored),
    };

    match body.status_message {
        Some(status_message) if !status_message.is_empty() => Ok(Inbound::CommandResponse {
            request_id: header.request_id,
            status_message,
        }),
        _ => Ok(Inbound::Ignored),
    }
}

/// Text-only classification. `None` means the message carries no status.
pub fn classify_status_message(message: &str) -> Option<WorldStatus> {
    if message.contains(NO_MATCH) {
        Some(WorldStatus::Closed)
    } else if message.contains(FOUND) {
        if message.contains("score=0") {
            Some(WorldStatus::Open)
        } else if message.contains("score=1") {
            Some(WorldStatus::Maintenance)
        } else {
            None
        }
    } else {
        None
    }
}

/// How the server answered one of this cycle's probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAnswer {
    /// The selector matched; the world is in this status.
    Held(WorldStatus),
    /// The selector matched nothing. Rules out the probe's hypothesis only.
    Missed,
    Unrecognized,
}

/// Reads a response to a known probe. An explicit score wins over the
/// hypothesis; a bare "Found" confirms the hypothesis.
pub fn classify_probe_answer(message: &str, hypothesis: Hypothesis) -> ProbeAnswer {
    if message.contains(NO_MATCH) {
        return ProbeAnswer::Missed;
    }
    match classify_status_message(message) {
        Some(status) => ProbeAnswer::Held(status),
        None if message.contains(FOUND) => ProbeAnswer::Held(hypothesis.status()),
        None => ProbeAnswer::Unrecognized,
    }
}

pub fn reply_indicates_failure(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    REJECTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Converts a console reply into the success/failure a probe is judged on.
pub fn check_console_reply(reply: String) -> Result<String> {
    if reply_indicates_failure(&reply) {
        Err(SyncError::CommandRejected { reply })
    } else {
        Ok(reply)
    }
}

/// Runs the session probes in priority order: maintenance, then open,
/// otherwise closed.
pub async fn classify_session<S: ConsoleSession + ?Sized>(
    session: &mut S,
    probes: &ProbeCommands,
) -> WorldStatus {
    for hypothesis in [Hypothesis::Maintenance, Hypothesis::Open] {
        let command = probes.scoreboard_test(hypothesis);
        match session.send(&command).await {
            Ok(reply) => {
                tracing::debug!("Probe '{}' held: {}", command, reply.trim());
                return hypothesis.status();
            }
            Err(e) => tracing::debug!("Probe '{}' failed: {}", command, e),
        }
    }
    WorldStatus::Closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn test_no_targets_matched_is_closed() {
        for message in [
            "No targets matched",
            "No targets matched selector",
            "§cNo targets matched @e[name=Bananakundao]",
        ] {
            assert_eq!(classify_status_message(message), Some(WorldStatus::Closed));
        }
    }

    #[test]
    fn test_found_with_score_is_classified() {
        assert_eq!(
            classify_status_message("Found 1, score=0"),
            Some(WorldStatus::Open)
        );
        assert_eq!(
            classify_status_message("Found 1, score=1"),
            Some(WorldStatus::Maintenance)
        );
    }

    #[test]
    fn test_unrelated_messages_carry_no_status() {
        assert_eq!(classify_status_message(""), None);
        assert_eq!(classify_status_message("Syntax error"), None);
        assert_eq!(classify_status_message("Found Bananakundao"), None);
    }

    #[test]
    fn test_probe_answers() {
        assert_eq!(
            classify_probe_answer("Found Bananakundao", Hypothesis::Maintenance),
            ProbeAnswer::Held(WorldStatus::Maintenance)
        );
        assert_eq!(
            classify_probe_answer("Found 1, score=0", Hypothesis::Maintenance),
            ProbeAnswer::Held(WorldStatus::Open)
        );
        assert_eq!(
            classify_probe_answer("No targets matched selector", Hypothesis::Open),
            ProbeAnswer::Missed
        );
        assert_eq!(
            classify_probe_answer("Syntax error", Hypothesis::Open),
            ProbeAnswer::Unrecognized
        );
    }

    #[test]
    fn test_parse_command_response() {
        let raw = r#"{"header":{"requestId":"r-1","messagePurpose":"commandResponse","version":1},
                      "body":{"statusCode":0,"statusMessage":"No targets matched"}}"#;
        assert_eq!(
            parse_inbound(raw).unwrap(),
            Inbound::CommandResponse {
                request_id: Some("r-1".to_string()),
                status_message: "No targets matched".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_ignores_events_and_other_purposes() {
        let chat = r#"{"header":{"messagePurpose":"event"},"body":{"eventName":"PlayerMessage","message":"hi"}}"#;
        assert_eq!(parse_inbound(chat).unwrap(), Inbound::Ignored);

        let no_message = r#"{"header":{"messagePurpose":"commandResponse"},"body":{}}"#;
        assert_eq!(parse_inbound(no_message).unwrap(), Inbound::Ignored);

        let no_body = r#"{"header":{"messagePurpose":"commandResponse"}}"#;
        assert_eq!(parse_inbound(no_body).unwrap(), Inbound::Ignored);
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        assert!(parse_inbound("not json").is_err());
        assert!(parse_inbound(r#"{"header": 5}"#).is_err());
    }

    #[test]
    fn test_reply_rejection_markers() {
        assert!(reply_indicates_failure("Score 0 is NOT in range 1 to 1"));
        assert!(reply_indicates_failure("Unknown command"));
        assert!(!reply_indicates_failure("Score 1 is in range 1 to 1"));
        assert!(!reply_indicates_failure(""));
    }

    struct ScriptedSession {
        accepted: Vec<String>,
        sent: Vec<String>,
    }

    #[async_trait]
    impl ConsoleSession for ScriptedSession {
        async fn send(&mut self, command: &str) -> Result<String> {
            self.sent.push(command.to_string());
            if self.accepted.iter().any(|c| c == command) {
                Ok("ok".to_string())
            } else {
                Err(SyncError::CommandRejected {
                    reply: "nope".to_string(),
                })
            }
        }

        async fn end(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_prefers_maintenance() {
        let probes = ProbeCommands::new("Bananakundao", "mente");
        let mut session = ScriptedSession {
            accepted: vec![
                probes.scoreboard_test(Hypothesis::Maintenance),
                probes.scoreboard_test(Hypothesis::Open),
            ],
            sent: vec![],
        };

        assert_eq!(
            classify_session(&mut session, &probes).await,
            WorldStatus::Maintenance
        );
        assert_eq!(session.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_session_falls_through_to_open_then_closed() {
        let probes = ProbeCommands::new("Bananakundao", "mente");
        let mut session = ScriptedSession {
            accepted: vec![probes.scoreboard_test(Hypothesis::Open)],
            sent: vec![],
        };
        assert_eq!(classify_session(&mut session, &probes).await, WorldStatus::Open);
        assert_eq!(session.sent.len(), 2);

        let mut session = ScriptedSession {
            accepted: vec![],
            sent: vec![],
        };
        assert_eq!(
            classify_session(&mut session, &probes).await,
            WorldStatus::Closed
        );
    }
}
