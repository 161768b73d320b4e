//! Redraw routine and output frames.
//!
//! Every byte the shell sends to the terminal is composed here and queued on an
//! [`OutputGate`]; the caller flushes once per gate hold.

use crate::core::output::{Color, OutputGate, TerminalCmd};
use crate::shell::editor::{LineEditor, Transition};
use crate::shell::line::InputLine;

/// A message printed above the prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMessage {
    pub text: String,
    /// Already formatted; rendered as `[timestamp] `.
    pub timestamp: Option<String>,
    pub color: Option<Color>,
}

fn clear_line(output: &mut OutputGate, columns: u16) {
    output.push(TerminalCmd::CarriageReturn);
    output.push(TerminalCmd::Blank(columns));
    output.push(TerminalCmd::CarriageReturn);
}

fn prompt_line(output: &mut OutputGate, prompt: &str, line: &InputLine) {
    let mut visible = String::with_capacity(prompt.len() + line.len());
    visible.push_str(prompt);
    visible.push_str(line.text());
    output.push(TerminalCmd::Text(visible));
    output.push(TerminalCmd::CursorLeft(line.cursor_offset_from_end()));
}

/// Make the current line read `prompt + text` with the cursor `offset` columns
/// left of its end.
pub fn redraw(output: &mut OutputGate, prompt: &str, line: &InputLine, columns: u16) {
    clear_line(output, columns);
    prompt_line(output, prompt, line);
}

/// Queue the terminal update for a key transition already applied to `editor`.
pub fn render_transition(
    output: &mut OutputGate,
    editor: &LineEditor,
    transition: &Transition,
    columns: u16,
) {
    match transition {
        Transition::Submitted { line, .. } => {
            clear_line(output, columns);
            output.push(TerminalCmd::Text(format!("{}{}", editor.prompt(), line)));
            output.push(TerminalCmd::NewLine);
            redraw(output, editor.prompt(), editor.line(), columns);
        }
        Transition::NudgedRight => {
            output.push(TerminalCmd::CursorRight(1));
            redraw(output, editor.prompt(), editor.line(), columns);
        }
        Transition::Edited | Transition::Ignored => {
            redraw(output, editor.prompt(), editor.line(), columns);
        }
    }
}

/// Queue a message line followed by the restored prompt line.
pub fn output_frame(
    output: &mut OutputGate,
    editor: &LineEditor,
    message: &OutputMessage,
    columns: u16,
) {
    clear_line(output, columns);

    if let Some(color) = message.color {
        output.push(TerminalCmd::Foreground(color));
    }
    if let Some(timestamp) = &message.timestamp {
        output.push(TerminalCmd::Text(format!("[{timestamp}] ")));
    }
    output.push(TerminalCmd::Text(normalize_line_breaks(&message.text)));
    if message.color.is_some() {
        output.push(TerminalCmd::ResetStyle);
    }
    output.push(TerminalCmd::NewLine);

    prompt_line(output, editor.prompt(), editor.line());
}

/// Raw mode does not return the carriage on `\n`.
fn normalize_line_breaks(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}
