pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{GitHubSink, LocalFileSink, RconConnector, WsTransport};
pub use config::{AppConfig, CliArgs};
pub use self::core::{engine::SyncEngine, publisher::StatusPublisher};
pub use domain::model::{RecordFormat, StatusRecord, WorldStatus};
pub use utils::error::{Result, SyncError};
