//! Shell and environment configuration.

use std::env;

use crate::error::{Result, ShellError};

pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_HISTORY_SIZE: u16 = 100;
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Construction parameters for a [`crate::Shell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    pub history_size: u16,
    /// `chrono` strftime pattern used for the `[timestamp] ` output prefix.
    pub timestamp_format: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_size: DEFAULT_HISTORY_SIZE,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl ShellConfig {
    pub fn new(prompt: impl Into<String>, history_size: u16) -> Self {
        Self {
            prompt: prompt.into(),
            history_size,
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_history_size(mut self, history_size: u16) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Defaults overridden by whatever [`EnvConfig`] finds in the environment.
    pub fn from_env() -> Self {
        EnvConfig::from_env().apply(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(ShellError::InvalidHistorySize(self.history_size));
        }
        Ok(())
    }
}

/// Environment overrides.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub prompt: Option<String>,
    pub history_size: Option<u16>,
    /// Append every terminal write to this file.
    pub write_log: Option<String>,
    /// Destination of the shell's own tracing diagnostics.
    pub log_file: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            prompt: env::var("DUPLEX_SHELL_PROMPT").ok(),
            history_size: env_string_opt("DUPLEX_SHELL_HISTORY_SIZE")
                .and_then(|value| value.trim().parse::<u16>().ok()),
            write_log: env_string_opt("DUPLEX_SHELL_WRITE_LOG"),
            log_file: env_string_opt("DUPLEX_SHELL_LOG_FILE"),
        }
    }

    pub fn apply(&self, mut config: ShellConfig) -> ShellConfig {
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(history_size) = self.history_size {
            config.history_size = history_size;
        }
        config
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
