// Adapters layer: concrete implementations for the game server transports and status sinks.

pub mod github;
pub mod rcon;
pub mod storage;
pub mod websocket;

pub use github::{GitHubSink, GitHubTarget};
pub use rcon::{RconConnector, RconSession};
pub use storage::LocalFileSink;
pub use websocket::{ConnectionState, WsTransport};
