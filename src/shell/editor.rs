//! Key transition table of the shell, as a pure state machine.
//!
//! The editor never touches the terminal; the key loop applies a key, then hands
//! the resulting [`Transition`] to the renderer while still holding the gate.

use unicode_width::UnicodeWidthStr;

use crate::config::ShellConfig;
use crate::core::keys::Key;
use crate::shell::history::{Browse, History};
use crate::shell::line::InputLine;

/// Columns kept free at the right edge; typing stops once the line would reach them.
const RIGHT_MARGIN: i64 = 5;

/// What a key did to the editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// State may have changed; redraw.
    Edited,
    /// Backspace with nothing before the cursor: nudge the cursor one column right, then redraw.
    NudgedRight,
    /// Enter: `line` is what was on screen, `command` what subscribers receive.
    Submitted {
        line: String,
        command: String,
        history: Vec<String>,
    },
    /// Unsupported key; nothing changed.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct LineEditor {
    prompt: String,
    prompt_width: usize,
    line: InputLine,
    history: History,
}

impl LineEditor {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            prompt_width: config.prompt.width(),
            prompt: config.prompt.clone(),
            line: InputLine::new(),
            history: History::new(config.history_size),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn line(&self) -> &InputLine {
        &self.line
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.prompt_width = self.prompt.width();
    }

    pub fn set_history_size(&mut self, history_size: u16) {
        self.history.set_capacity(history_size);
    }

    /// Apply one key. `columns` is the current terminal width.
    pub fn apply(&mut self, key: &Key, columns: u16) -> Transition {
        let transition = match key {
            Key::Enter => self.submit(),
            Key::Backspace => {
                if self.line.remove_before_cursor() {
                    Transition::Edited
                } else {
                    Transition::NudgedRight
                }
            }
            Key::Delete => {
                self.line.remove_at_cursor();
                Transition::Edited
            }
            Key::Up => {
                if let Browse::Entry(entry) = self.history.older() {
                    self.line.set(entry);
                }
                Transition::Edited
            }
            Key::Down => {
                match self.history.newer() {
                    Browse::Entry(entry) => self.line.set(entry),
                    Browse::Fresh => self.line.clear(),
                    Browse::Unchanged => {}
                }
                Transition::Edited
            }
            Key::Left => {
                self.line.move_left();
                Transition::Edited
            }
            Key::Right => {
                self.line.move_right();
                Transition::Edited
            }
            Key::Home => {
                self.line.move_home();
                Transition::Edited
            }
            Key::End => {
                self.line.move_end();
                Transition::Edited
            }
            Key::Char(ch) if is_command_char(*ch) => {
                if self.has_room(columns) {
                    self.line.insert(*ch);
                }
                Transition::Edited
            }
            Key::Char(_) | Key::Other(_) => Transition::Ignored,
        };

        debug_assert!(self.line.cursor_offset_from_end() <= self.line.len());
        debug_assert!(self.history.len() <= self.history.capacity());
        transition
    }

    fn submit(&mut self) -> Transition {
        self.line.move_end();
        let line = self.line.text().to_string();
        let trimmed = line.trim();
        let command = if trimmed.is_empty() {
            String::new()
        } else {
            let command = trimmed.to_string();
            if let Some(evicted) = self.history.push(command.clone()) {
                tracing::trace!(evicted = %evicted, "history full, evicted oldest entry");
            }
            command
        };
        self.history.reset_browse();
        self.line.clear();

        Transition::Submitted {
            line,
            command,
            history: self.history.snapshot(),
        }
    }

    fn has_room(&self, columns: u16) -> bool {
        ((self.prompt_width + self.line.len()) as i64) < columns as i64 - RIGHT_MARGIN
    }
}

/// Characters accepted into a command line: letters, digits, space and `.,-+`.
pub fn is_command_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '.' | ',' | '-' | '+')
}
