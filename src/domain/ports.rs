use crate::domain::model::StatusRecord;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Durable destination for published status documents.
pub trait StatusSink: Send + Sync {
    /// `document` is the already rendered body; `record` is passed along for
    /// metadata such as commit messages.
    fn write_status(
        &self,
        record: &StatusRecord,
        document: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Human readable destination, used in logs.
    fn describe(&self) -> String;
}

/// One remote-console session: authenticated, used for a few commands, closed.
#[async_trait]
pub trait ConsoleSession: Send {
    /// Runs a command and returns the console reply. A failed command is an `Err`.
    async fn send(&mut self, command: &str) -> Result<String>;

    async fn end(&mut self) -> Result<()>;
}

#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    type Session: ConsoleSession;

    async fn connect(&self) -> Result<Self::Session>;
}
