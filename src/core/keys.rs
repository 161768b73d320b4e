//! Key decoding for legacy, xterm and kitty keyboard sequences.

const CODEPOINT_ENTER: u32 = 13;
const CODEPOINT_BACKSPACE: u32 = 127;
const CODEPOINT_KP_0: u32 = 57399;
const CODEPOINT_KP_9: u32 = 57408;
const CODEPOINT_KP_DECIMAL: u32 = 57409;
const CODEPOINT_KP_SUBTRACT: u32 = 57412;
const CODEPOINT_KP_ADD: u32 = 57413;
const CODEPOINT_KP_ENTER: u32 = 57414;

const MOD_SHIFT: u8 = 1;
const LOCK_MASK: u8 = 64 + 128;

const LEGACY_ENTER: [&str; 3] = ["\r", "\n", "\x1bOM"];
const LEGACY_BACKSPACE: [&str; 2] = ["\x7f", "\x08"];
const LEGACY_UP: [&str; 2] = ["\x1b[A", "\x1bOA"];
const LEGACY_DOWN: [&str; 2] = ["\x1b[B", "\x1bOB"];
const LEGACY_RIGHT: [&str; 2] = ["\x1b[C", "\x1bOC"];
const LEGACY_LEFT: [&str; 2] = ["\x1b[D", "\x1bOD"];
const LEGACY_HOME: [&str; 4] = ["\x1b[H", "\x1bOH", "\x1b[1~", "\x1b[7~"];
const LEGACY_END: [&str; 4] = ["\x1b[F", "\x1bOF", "\x1b[4~", "\x1b[8~"];
const LEGACY_DELETE: [&str; 1] = ["\x1b[3~"];

/// A decoded key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// A single printable character as typed (case preserved).
    Char(char),
    /// Anything else, kept raw for diagnostics.
    Other(String),
}

impl Key {
    /// Short stable name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Key::Enter => "enter",
            Key::Backspace => "backspace",
            Key::Delete => "delete",
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Home => "home",
            Key::End => "end",
            Key::Char(_) => "char",
            Key::Other(_) => "other",
        }
    }
}

/// Decode one complete key sequence as produced by the stdin sequence buffer.
pub fn parse_key(data: &str) -> Key {
    if let Some(key) = legacy_key(data) {
        return key;
    }
    if let Some(key) = parse_kitty_sequence(data) {
        return key;
    }

    let mut chars = data.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if (' '..='~').contains(&ch) {
            return Key::Char(ch);
        }
    }

    Key::Other(data.to_string())
}

fn legacy_key(data: &str) -> Option<Key> {
    let table: [(&[&str], Key); 9] = [
        (&LEGACY_ENTER, Key::Enter),
        (&LEGACY_BACKSPACE, Key::Backspace),
        (&LEGACY_UP, Key::Up),
        (&LEGACY_DOWN, Key::Down),
        (&LEGACY_RIGHT, Key::Right),
        (&LEGACY_LEFT, Key::Left),
        (&LEGACY_HOME, Key::Home),
        (&LEGACY_END, Key::End),
        (&LEGACY_DELETE, Key::Delete),
    ];
    table
        .into_iter()
        .find(|(sequences, _)| sequences.contains(&data))
        .map(|(_, key)| key)
}

/// Parse `CSI <codepoint>[:...][;<mod>[:<event>]] u`, `CSI <n>[;<mod>] ~` and
/// `CSI 1;<mod> <A-D|H|F>`. Release events and modified keys other than shift
/// decode to [`Key::Other`].
fn parse_kitty_sequence(data: &str) -> Option<Key> {
    let stripped = data.strip_prefix("\x1b[")?;

    if let Some(body) = stripped.strip_suffix('u') {
        let (code_part, mod_part) = match body.split_once(';') {
            Some((left, right)) => (left, Some(right)),
            None => (body, None),
        };
        let codepoint = code_part.split(':').next()?.parse::<u32>().ok()?;
        let (modifier, released) = parse_modifier(mod_part);
        if released || modifier & !MOD_SHIFT != 0 {
            return Some(Key::Other(data.to_string()));
        }

        let key = match codepoint {
            CODEPOINT_ENTER | CODEPOINT_KP_ENTER => Key::Enter,
            CODEPOINT_BACKSPACE => Key::Backspace,
            CODEPOINT_KP_0..=CODEPOINT_KP_9 => {
                let digit = codepoint - CODEPOINT_KP_0;
                Key::Char(char::from_digit(digit, 10)?)
            }
            CODEPOINT_KP_DECIMAL => Key::Char('.'),
            CODEPOINT_KP_SUBTRACT => Key::Char('-'),
            CODEPOINT_KP_ADD => Key::Char('+'),
            cp => {
                let ch = char::from_u32(cp)?;
                if !(' '..='~').contains(&ch) {
                    return Some(Key::Other(data.to_string()));
                }
                if modifier & MOD_SHIFT != 0 {
                    Key::Char(ch.to_ascii_uppercase())
                } else {
                    Key::Char(ch)
                }
            }
        };
        return Some(key);
    }

    if let Some(body) = stripped.strip_suffix('~') {
        let (num_part, mod_part) = match body.split_once(';') {
            Some((left, right)) => (left, Some(right)),
            None => (body, None),
        };
        let (modifier, released) = parse_modifier(mod_part);
        if released || modifier != 0 {
            return Some(Key::Other(data.to_string()));
        }
        return match num_part.parse::<u32>().ok()? {
            1 | 7 => Some(Key::Home),
            3 => Some(Key::Delete),
            4 | 8 => Some(Key::End),
            _ => Some(Key::Other(data.to_string())),
        };
    }

    if let Some(rest) = stripped.strip_prefix("1;") {
        let final_char = rest.chars().last()?;
        let mod_part = &rest[..rest.len() - final_char.len_utf8()];
        let (modifier, released) = parse_modifier(Some(mod_part));
        if released || modifier != 0 {
            return Some(Key::Other(data.to_string()));
        }
        return match final_char {
            'A' => Some(Key::Up),
            'B' => Some(Key::Down),
            'C' => Some(Key::Right),
            'D' => Some(Key::Left),
            'H' => Some(Key::Home),
            'F' => Some(Key::End),
            _ => None,
        };
    }

    None
}

/// Returns `(modifier bits without lock keys, is_release)`.
fn parse_modifier(mod_part: Option<&str>) -> (u8, bool) {
    let Some(mod_part) = mod_part else {
        return (0, false);
    };
    let (mod_value, event_value) = match mod_part.split_once(':') {
        Some((left, right)) => (left, Some(right)),
        None => (mod_part, None),
    };
    let modifier = mod_value.parse::<u8>().unwrap_or(1).saturating_sub(1) & !LOCK_MASK;
    let released = event_value.and_then(|value| value.parse::<u8>().ok()) == Some(3);
    (modifier, released)
}
