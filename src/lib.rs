//! Synchronized line-editing console shell.
//!
//! A [`Shell`] owns the terminal: one thread reads and applies keys to the
//! input line, while any number of host threads print messages above it with
//! [`Shell::output`] and friends. Both sides go through one gate, so a message
//! never tears the line being typed and the partial input is restored after
//! every message.
//!
//! Invariant: single output gate. Only `core::output::OutputGate::flush(..)`
//! writes to the terminal, once per gate hold.
//!
//! # Public API Overview
//! - Start a shell with [`Shell::new`] (process stdin/stdout) or
//!   [`Shell::start`] over any [`Terminal`].
//! - Print with [`Shell::output`], [`Shell::output_plain`], [`Shell::warning`],
//!   [`Shell::error`] or [`Shell::output_with`].
//! - React to Enter with [`Shell::on_command`] or [`Shell::command_channel`].
//! - Route host `tracing` events to the shell with [`logging::ShellLogLayer`].

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod shell;

/// Construction parameters and environment overrides.
pub use crate::config::{EnvConfig, ShellConfig};
pub use crate::error::{Result, ShellError};

/// Shell handle and its notification payload.
pub use crate::shell::events::CommandIssued;
pub use crate::shell::line::InputLine;
pub use crate::shell::Shell;

/// Terminal interfaces and process-backed implementation.
pub use crate::core::keys::{parse_key, Key};
pub use crate::core::output::Color;
pub use crate::core::terminal::Terminal;
pub use crate::platform::ProcessTerminal;
