pub mod classifier;
pub mod command;
pub mod engine;
pub mod publisher;
pub mod rcon_monitor;
pub mod scheduler;
pub mod ws_monitor;

