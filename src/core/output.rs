//! Typed terminal output commands and a single output gate.
//!
//! Invariant: all terminal writes must flow through `OutputGate::flush(..)`, and one
//! flush is exactly one `Terminal::write(..)` call.

use crate::core::terminal::Terminal;

/// Foreground colors available to output calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    /// SGR parameter selecting this color as foreground.
    pub fn sgr_code(self) -> u8 {
        match self {
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::Gray => 90,
            Color::BrightRed => 91,
            Color::BrightGreen => 92,
            Color::BrightYellow => 93,
            Color::BrightBlue => 94,
            Color::BrightMagenta => 95,
            Color::BrightCyan => 96,
            Color::BrightWhite => 97,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Text written verbatim.
    Text(String),
    /// Return to column 0 of the current line.
    CarriageReturn,
    /// `\r\n`; raw mode does not translate a bare line feed.
    NewLine,
    /// Overwrite `width` columns with blanks.
    Blank(u16),
    CursorLeft(usize),
    CursorRight(usize),
    Foreground(Color),
    ResetStyle,
}

impl TerminalCmd {
    fn encode_into(&self, out: &mut String) {
        match self {
            TerminalCmd::Text(data) => out.push_str(data),
            TerminalCmd::CarriageReturn => out.push('\r'),
            TerminalCmd::NewLine => out.push_str("\r\n"),
            TerminalCmd::Blank(width) => {
                out.extend(std::iter::repeat(' ').take(*width as usize));
            }
            TerminalCmd::CursorLeft(0) | TerminalCmd::CursorRight(0) => {}
            TerminalCmd::CursorLeft(n) => out.push_str(&format!("\x1b[{n}D")),
            TerminalCmd::CursorRight(n) => out.push_str(&format!("\x1b[{n}C")),
            TerminalCmd::Foreground(color) => out.push_str(&format!("\x1b[{}m", color.sgr_code())),
            TerminalCmd::ResetStyle => out.push_str("\x1b[0m"),
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    /// Encode buffered commands without draining them.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for cmd in &self.cmds {
            cmd.encode_into(&mut out);
        }
        out
    }

    /// Flush buffered commands to the terminal as a single write.
    ///
    /// This is the single write gate: `Terminal::write(..)` must not be called
    /// from anywhere else.
    pub fn flush<T: Terminal + ?Sized>(&mut self, term: &mut T) {
        if self.cmds.is_empty() {
            return;
        }
        let data = self.encode();
        self.cmds.clear();
        term.write(&data);
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, OutputGate, TerminalCmd};
    use crate::core::terminal::Terminal;

    #[derive(Default)]
    struct RecordingTerminal {
        writes: Vec<String>,
    }

    impl Terminal for RecordingTerminal {
        fn start(&mut self, _on_input: Box<dyn FnMut(String) + Send>) -> std::io::Result<()> {
            Ok(())
        }
        fn stop(&mut self) -> std::io::Result<()> {
            Ok(())
        }
        fn write(&mut self, data: &str) {
            self.writes.push(data.to_string());
        }
        fn columns(&self) -> u16 {
            80
        }
    }

    #[test]
    fn flush_coalesces_into_one_write() {
        let mut gate = OutputGate::new();
        gate.push(TerminalCmd::CarriageReturn);
        gate.push(TerminalCmd::Blank(3));
        gate.push(TerminalCmd::CarriageReturn);
        gate.push(TerminalCmd::Text("> ab".to_string()));
        gate.push(TerminalCmd::CursorLeft(1));

        let mut term = RecordingTerminal::default();
        gate.flush(&mut term);

        assert_eq!(term.writes, vec!["\r   \r> ab\x1b[1D".to_string()]);
        assert!(gate.is_empty());
    }

    #[test]
    fn empty_flush_does_not_write() {
        let mut term = RecordingTerminal::default();
        OutputGate::new().flush(&mut term);
        assert!(term.writes.is_empty());
    }

    #[test]
    fn zero_cursor_moves_encode_to_nothing() {
        let mut gate = OutputGate::new();
        gate.push(TerminalCmd::CursorLeft(0));
        gate.push(TerminalCmd::CursorRight(0));
        assert_eq!(gate.encode(), "");
    }

    #[test]
    fn colors_wrap_with_reset() {
        let mut gate = OutputGate::new();
        for cmd in [
            TerminalCmd::Foreground(Color::Yellow),
            TerminalCmd::Text("careful".to_string()),
            TerminalCmd::ResetStyle,
            TerminalCmd::NewLine,
        ] {
            gate.push(cmd);
        }
        assert_eq!(gate.encode(), "\x1b[33mcareful\x1b[0m\r\n");
        assert_eq!(Color::Red.sgr_code(), 31);
    }
}
