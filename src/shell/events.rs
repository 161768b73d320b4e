//! Command notifications.

use std::sync::mpsc::{self, Receiver, Sender};

/// Fired once per Enter, including the empty command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIssued {
    /// Trimmed line; empty when the line was blank.
    pub command: String,
    /// History after the command was recorded, most recent first.
    pub history: Vec<String>,
}

pub type CommandHandler = Box<dyn FnMut(&CommandIssued) + Send>;

/// Registered subscribers and channel consumers.
#[derive(Default)]
pub(crate) struct Subscribers {
    handlers: Vec<CommandHandler>,
    channels: Vec<Sender<CommandIssued>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: CommandHandler) {
        self.handlers.push(handler);
    }

    pub fn add_channel(&mut self) -> Receiver<CommandIssued> {
        let (tx, rx) = mpsc::channel();
        self.channels.push(tx);
        rx
    }

    /// Append `other`'s subscribers after this list's.
    pub fn merge(&mut self, other: Subscribers) {
        self.handlers.extend(other.handlers);
        self.channels.extend(other.channels);
    }

    pub fn len(&self) -> usize {
        self.handlers.len() + self.channels.len()
    }

    /// Call every handler in registration order, then feed the channels.
    /// Channels whose receiver is gone are dropped.
    pub fn notify(&mut self, event: &CommandIssued) {
        for handler in &mut self.handlers {
            handler(event);
        }
        self.channels.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("handlers", &self.handlers.len())
            .field("channels", &self.channels.len())
            .finish()
    }
}
