//! Commits the status document to a GitHub repository through the contents API.

use crate::domain::model::StatusRecord;
use crate::domain::ports::StatusSink;
use crate::utils::error::{Result, SyncError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("world-status-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubTarget {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct ContentMetadata {
    sha: String,
}

#[derive(Debug, Serialize)]
struct UpdateContentRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

pub struct GitHubSink {
    client: Client,
    target: GitHubTarget,
}

impl GitHubSink {
    pub fn new(target: GitHubTarget, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, target })
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.target.api_url.trim_end_matches('/'),
            self.target.owner,
            self.target.repo,
            self.target.path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.target.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Revision marker of the current file, `None` when it does not exist yet.
    pub async fn current_sha(&self) -> Result<Option<String>> {
        let mut request = self.client.get(self.contents_url());
        if let Some(branch) = &self.target.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = self.authorized(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::info!(
                "📄 {} does not exist yet, it will be created",
                self.target.path
            );
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::SinkError {
                message: format!("GET {} returned {}: {}", self.target.path, status, body),
            });
        }

        let metadata: ContentMetadata = response.json().await?;
        Ok(Some(metadata.sha))
    }
}

impl StatusSink for GitHubSink {
    async fn write_status(&self, record: &StatusRecord, document: &str) -> Result<()> {
        let sha = self.current_sha().await?;

        let payload = UpdateContentRequest {
            message: format!("Update world status: {}", record.status),
            content: STANDARD.encode(document.as_bytes()),
            sha,
            branch: self.target.branch.as_deref(),
        };

        tracing::debug!(
            "PUT {} (sha: {:?})",
            self.contents_url(),
            payload.sha.as_deref()
        );

        let response = self
            .authorized(self.client.put(self.contents_url()))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::SinkError {
                message: format!("PUT {} returned {}: {}", self.target.path, status, body),
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "github {}/{}:{}",
            self.target.owner, self.target.repo, self.target.path
        )
    }
}
