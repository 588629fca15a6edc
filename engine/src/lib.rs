//! Spectre engine: configuration and the chat session loop.

mod config;
mod session;

pub use config::{ConfigError, Settings, SpectreConfig};
pub use session::{Session, TurnEvent, TurnOutcome};
