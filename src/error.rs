//! Error type for shell construction and lifecycle.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// History must hold at least one entry.
    #[error("invalid history size {0}: must be between 1 and 65535")]
    InvalidHistorySize(u16),

    /// The terminal could not be put into (or taken out of) raw mode.
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("shell has already been shut down")]
    AlreadyShutDown,
}

pub type Result<T> = std::result::Result<T, ShellError>;
