//! Shield Error Types

use frame_protocol::LinkError;
use thiserror::Error;

/// Errors from the shield simulator
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}
