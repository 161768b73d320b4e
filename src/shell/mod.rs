//! The synchronized shell: one gate over the terminal, a key-read loop thread,
//! and the output API host code calls from any thread.
//!
//! Every gate hold ends in exactly one terminal write, so an output frame or a
//! redraw is never interleaved with another.

pub mod editor;
pub mod events;
pub mod history;
pub mod line;
pub mod render;

use std::fmt::Write as _;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};

use crate::config::{ShellConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::core::keys::{parse_key, Key};
use crate::core::output::{Color, OutputGate, TerminalCmd};
use crate::core::terminal::{Terminal, TerminalGuard};
use crate::error::{Result, ShellError};
use crate::platform::ProcessTerminal;

use self::editor::{LineEditor, Transition};
use self::events::{CommandIssued, Subscribers};
use self::line::InputLine;
use self::render::OutputMessage;

enum KeyLoopMessage {
    Input(String),
    Stop,
}

/// Everything guarded by the gate.
struct Console {
    terminal: TerminalGuard<Box<dyn Terminal>>,
    editor: LineEditor,
    output: OutputGate,
    timestamp_format: String,
    shut_down: bool,
}

impl Console {
    fn columns(&mut self) -> u16 {
        self.terminal
            .terminal_mut()
            .map_or(0, |terminal| terminal.columns())
    }

    fn flush(&mut self) {
        if let Some(terminal) = self.terminal.terminal_mut() {
            self.output.flush(terminal);
        } else {
            self.output.clear();
        }
    }

    fn redraw(&mut self) {
        let columns = self.columns();
        render::redraw(
            &mut self.output,
            self.editor.prompt(),
            self.editor.line(),
            columns,
        );
        self.flush();
    }

    fn apply_key(&mut self, key: &Key) -> Option<CommandIssued> {
        let columns = self.columns();
        let transition = self.editor.apply(key, columns);
        tracing::trace!(key = key.name(), ?transition, "key applied");

        render::render_transition(&mut self.output, &self.editor, &transition, columns);
        self.flush();

        match transition {
            Transition::Submitted {
                command, history, ..
            } => Some(CommandIssued { command, history }),
            _ => None,
        }
    }

    fn write_message(&mut self, text: &str, include_timestamp: bool, color: Option<Color>) {
        let message = OutputMessage {
            text: text.to_string(),
            timestamp: include_timestamp.then(|| self.timestamp()),
            color,
        };
        let columns = self.columns();
        render::output_frame(&mut self.output, &self.editor, &message, columns);
        self.flush();
    }

    fn timestamp(&self) -> String {
        let now = chrono::Local::now();
        let mut stamp = String::new();
        if write!(stamp, "{}", now.format(&self.timestamp_format)).is_err() {
            stamp.clear();
            let _ = write!(stamp, "{}", now.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        stamp
    }
}

struct KeyLoop {
    sender: Sender<KeyLoopMessage>,
    handle: JoinHandle<()>,
}

struct ShellInner {
    console: Mutex<Console>,
    subscribers: Mutex<Subscribers>,
    key_loop: Mutex<Option<KeyLoop>>,
}

impl ShellInner {
    fn console(&self) -> MutexGuard<'_, Console> {
        self.console
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Called with the gate released, after the submitted line and the fresh
    /// prompt are already on screen: handlers may print through the shell.
    /// Runs handlers without holding the subscriber lock, so a handler may
    /// register further subscribers.
    fn notify(&self, event: &CommandIssued) {
        let mut active = std::mem::take(&mut *self.subscribers());
        tracing::debug!(
            command = %event.command,
            subscribers = active.len(),
            "command issued"
        );
        active.notify(event);

        let mut subscribers = self.subscribers();
        let added = std::mem::take(&mut *subscribers);
        active.merge(added);
        *subscribers = active;
    }
}

/// Exits on `Stop`, or as soon as the gate reports shutdown; keys still
/// queued at that point are discarded.
fn run_key_loop(inner: Arc<ShellInner>, keys: Receiver<KeyLoopMessage>) {
    while let Ok(KeyLoopMessage::Input(data)) = keys.recv() {
        let key = parse_key(&data);
        let issued = {
            let mut console = inner.console();
            if console.shut_down {
                break;
            }
            console.apply_key(&key)
        };
        if let Some(event) = issued {
            inner.notify(&event);
            if inner.console().shut_down {
                break;
            }
        }
    }
    tracing::debug!("key loop stopped");
}

/// Handle to a running shell. Clones share the same terminal and state.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    /// Shell over the process's own stdin/stdout.
    pub fn new(config: ShellConfig) -> Result<Self> {
        Self::start(ProcessTerminal::new(), config)
    }

    /// Put `terminal` in raw mode, draw the prompt and start reading keys.
    pub fn start<T: Terminal + 'static>(terminal: T, config: ShellConfig) -> Result<Self> {
        config.validate()?;

        let (sender, keys) = mpsc::channel();
        let mut terminal: Box<dyn Terminal> = Box::new(terminal);
        let input = sender.clone();
        terminal.start(Box::new(move |data| {
            let _ = input.send(KeyLoopMessage::Input(data));
        }))?;

        let console = Console {
            terminal: TerminalGuard::new(terminal),
            editor: LineEditor::new(&config),
            output: OutputGate::new(),
            timestamp_format: config.timestamp_format.clone(),
            shut_down: false,
        };
        let inner = Arc::new(ShellInner {
            console: Mutex::new(console),
            subscribers: Mutex::new(Subscribers::new()),
            key_loop: Mutex::new(None),
        });
        inner.console().redraw();

        let loop_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name("duplex-shell-keys".to_string())
            .spawn(move || run_key_loop(loop_inner, keys))?;
        *inner
            .key_loop
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(KeyLoop { sender, handle });

        tracing::info!(
            prompt = %config.prompt,
            history_size = config.history_size,
            "shell started"
        );
        Ok(Self { inner })
    }

    /// Timestamped message in the default color.
    pub fn output(&self, message: &str) {
        self.output_with(message, true, None);
    }

    /// Message without timestamp.
    pub fn output_plain(&self, message: &str) {
        self.output_with(message, false, None);
    }

    pub fn warning(&self, message: &str) {
        self.output_with(message, true, Some(Color::Yellow));
    }

    pub fn error(&self, message: &str) {
        self.output_with(message, true, Some(Color::Red));
    }

    /// Print `message` above the prompt and restore the partially typed line.
    /// Waits for the gate; never interleaves with a redraw.
    pub fn output_with(&self, message: &str, include_timestamp: bool, color: Option<Color>) {
        let mut console = self.inner.console();
        if console.shut_down {
            return;
        }
        console.write_message(message, include_timestamp, color);
    }

    /// Register a subscriber. Handlers run on the key-loop thread, in
    /// registration order, after the terminal has been updated.
    pub fn on_command<F>(&self, handler: F)
    where
        F: FnMut(&CommandIssued) + Send + 'static,
    {
        self.inner.subscribers().add_handler(Box::new(handler));
    }

    /// Receive every subsequent command on a channel.
    pub fn command_channel(&self) -> Receiver<CommandIssued> {
        self.inner.subscribers().add_channel()
    }

    /// History, most recent first.
    pub fn history(&self) -> Vec<String> {
        self.inner.console().editor.history().snapshot()
    }

    pub fn input_line(&self) -> InputLine {
        self.inner.console().editor.line().clone()
    }

    pub fn prompt(&self) -> String {
        self.inner.console().editor.prompt().to_string()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) -> Result<()> {
        let mut console = self.inner.console();
        if console.shut_down {
            return Err(ShellError::AlreadyShutDown);
        }
        console.editor.set_prompt(prompt);
        console.redraw();
        Ok(())
    }

    /// Change the history bound; shrinking evicts the oldest entries now.
    pub fn set_history_size(&self, history_size: u16) -> Result<()> {
        if history_size == 0 {
            return Err(ShellError::InvalidHistorySize(history_size));
        }
        let mut console = self.inner.console();
        if console.shut_down {
            return Err(ShellError::AlreadyShutDown);
        }
        console.editor.set_history_size(history_size);
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.console().shut_down
    }

    /// Leave the cursor on a fresh line, restore the terminal and stop the key
    /// loop. May be called from a command handler.
    ///
    /// Later or concurrent calls return once the terminal has been restored.
    pub fn shutdown(&self) -> Result<()> {
        // Lock order: key loop slot, then gate. The key-loop thread only
        // takes the gate, so holding the slot here cannot block it.
        let mut key_loop = self
            .inner
            .key_loop
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(KeyLoop { sender, handle }) = key_loop.take() else {
            return Ok(());
        };

        let stopped = {
            let mut console = self.inner.console();
            console.output.push(TerminalCmd::NewLine);
            console.flush();
            console.shut_down = true;
            match console.terminal.terminal_mut() {
                Some(terminal) => terminal.stop(),
                None => Ok(()),
            }
        };
        drop(key_loop);

        let _ = sender.send(KeyLoopMessage::Stop);
        // A handler calling shutdown runs on the key-loop thread itself.
        if handle.thread().id() != current_thread_id() && handle.join().is_err() {
            tracing::warn!("key loop panicked before shutdown");
        }
        tracing::info!("shell shut down");
        stopped.map_err(ShellError::from)
    }
}

fn current_thread_id() -> ThreadId {
    thread::current().id()
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell").finish_non_exhaustive()
    }
}
