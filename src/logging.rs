//! Diagnostics setup.
//!
//! The shell owns stdout, so its own `tracing` output goes to a file. Host
//! applications can additionally route their events onto the shell with
//! [`ShellLogLayer`].

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter, Layer};

use crate::shell::Shell;

/// Filter directives are read from this variable; defaults to `info`.
pub const LOG_FILTER_ENV: &str = "DUPLEX_SHELL_LOG";

const CRATE_TARGET: &str = "duplex_shell";

/// Install the global subscriber, writing to `path` (truncated).
pub fn init_file_logging(path: &Path) -> std::io::Result<()> {
    let log_file = File::create(path)?;
    build_subscriber(log_file, None)
        .try_init()
        .map_err(|err| std::io::Error::other(err.to_string()))
}

/// File logging plus, optionally, host events echoed onto the shell.
pub fn build_subscriber(
    log_file: File,
    shell_layer: Option<ShellLogLayer>,
) -> impl Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt_layer::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        .with(shell_layer)
}

/// Forwards events from outside this crate to the shell:
/// ERROR as [`Shell::error`], WARN as [`Shell::warning`], the rest as [`Shell::output`].
///
/// Events emitted by the shell itself are skipped; they can fire while the
/// gate is held.
#[derive(Debug, Clone)]
pub struct ShellLogLayer {
    shell: Shell,
}

impl ShellLogLayer {
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }

    fn write_event(&self, event: &Event<'_>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let line = visitor.into_line();

        match *metadata.level() {
            Level::ERROR => self.shell.error(&line),
            Level::WARN => self.shell.warning(&line),
            _ => self.shell.output(&line),
        }
    }
}

impl<S> Layer<S> for ShellLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.write_event(event);
    }
}

fn is_internal(target: &str) -> bool {
    target == CRATE_TARGET
        || target
            .strip_prefix(CRATE_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EventVisitor {
    /// `message key=value ...`
    fn into_line(self) -> String {
        let mut line = self.message.unwrap_or_default();
        for (name, value) in self.fields {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&name);
            line.push('=');
            line.push_str(&value);
        }
        line
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_subscriber, is_internal, ShellLogLayer};
    use crate::config::ShellConfig;
    use crate::core::terminal::Terminal;
    use crate::shell::Shell;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    #[derive(Clone, Default)]
    struct RecordingTerminal {
        writes: Arc<Mutex<Vec<String>>>,
    }

    impl Terminal for RecordingTerminal {
        fn start(&mut self, _on_input: Box<dyn FnMut(String) + Send>) -> std::io::Result<()> {
            Ok(())
        }
        fn stop(&mut self) -> std::io::Result<()> {
            Ok(())
        }
        fn write(&mut self, data: &str) {
            self.writes.lock().expect("writes").push(data.to_string());
        }
        fn columns(&self) -> u16 {
            40
        }
    }

    #[test]
    fn internal_targets_are_recognized() {
        assert!(is_internal("duplex_shell"));
        assert!(is_internal("duplex_shell::shell"));
        assert!(!is_internal("duplex_shell_host"));
        assert!(!is_internal("my_server::net"));
    }

    #[test]
    fn file_layer_writes_events() {
        let log_file = NamedTempFile::new().expect("temp file");
        let subscriber = build_subscriber(log_file.reopen().expect("reopen"), None);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(peer = "10.0.0.7", "client connected");
        });

        let contents = std::fs::read_to_string(log_file.path()).expect("read log");
        assert!(contents.contains("INFO"));
        assert!(contents.contains("client connected"));
        assert!(contents.contains("peer=\"10.0.0.7\""));
    }

    #[test]
    fn host_events_reach_the_shell_with_level_colors() {
        let terminal = RecordingTerminal::default();
        let shell = Shell::start(terminal.clone(), ShellConfig::default()).expect("start");
        let log_file = NamedTempFile::new().expect("temp file");
        let subscriber = build_subscriber(
            log_file.reopen().expect("reopen"),
            Some(ShellLogLayer::new(shell.clone())),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "host::net", retries = 3, "link flapping");
            tracing::error!(target: "host::disk", "disk full");
            tracing::info!(target: "duplex_shell::shell", "internal");
        });
        shell.shutdown().expect("shutdown");

        let writes = terminal.writes.lock().expect("writes").clone();
        let warning = writes
            .iter()
            .find(|w| w.contains("link flapping retries=3"))
            .expect("warning frame");
        assert!(warning.contains("\x1b[33m"));
        let error = writes
            .iter()
            .find(|w| w.contains("disk full"))
            .expect("error frame");
        assert!(error.contains("\x1b[31m"));
        assert!(!writes.iter().any(|w| w.contains("internal")));
    }
}
