
use duplex_shell::{Color, Shell, ShellConfig};
use fixture::{clear_line, ScriptedTerminal, WAIT};
use pretty_assertions::assert_eq;

const ENTER: &str = "\r";
const BACKSPACE: &str = "\x7f";
const LEFT: &str = "\x1b[D";
const UP: &str = "\x1b[A";
const DOWN: &str = "\x1b[B";
const HOME: &str = "\x1b[H";
const RIGHT: &str = "\x1b[C";
const END: &str = "\x1b[F";
const DELETE: &str = "\x1b[3~";

fn start(columns: u16, config: ShellConfig) -> (ScriptedTerminal, Shell) {
    let terminal = ScriptedTerminal::new(columns);
    let shell = Shell::start(terminal.clone(), config).expect("shell start");
    assert!(terminal.is_started());
    (terminal, shell)
}

/// Wait until the last write shows `prompt_line` (cursor moves included).
fn wait_for_prompt_line(terminal: &ScriptedTerminal, prompt_line: &str) {
    let shown = terminal.wait_for(|writes| {
        writes
            .last()
            .is_some_and(|last| last.ends_with(prompt_line))
    });
    assert!(shown, "prompt line {prompt_line:?} never drawn: {:?}", terminal.writes());
}

#[test]
fn history_is_bounded_and_most_recent_first() {
    let (terminal, shell) = start(40, ShellConfig::default().with_history_size(2));
    let commands = shell.command_channel();

    for command in ["a", "b", "c"] {
        terminal.type_text(command);
        terminal.send_input(ENTER);
        commands.recv_timeout(WAIT).expect("command");
    }

    assert_eq!(shell.history(), ["c", "b"]);
    shell.shutdown().expect("shutdown");
}

#[test]
fn backspace_inside_the_line() {
    let (terminal, shell) = start(40, ShellConfig::default());
    terminal.type_text("hello");
    terminal.send_input(LEFT);
    terminal.send_input(LEFT);
    terminal.send_input(BACKSPACE);
    wait_for_prompt_line(&terminal, "> helo\x1b[2D");

    let line = shell.input_line();
    assert_eq!(line.text(), "helo");
    assert_eq!(line.cursor_offset_from_end(), 2);
    shell.shutdown().expect("shutdown");
}

#[test]
fn up_up_down_recalls_history() {
    let (terminal, shell) = start(40, ShellConfig::default());
    let commands = shell.command_channel();
    for command in ["bar", "foo"] {
        terminal.type_text(command);
        terminal.send_input(ENTER);
        commands.recv_timeout(WAIT).expect("command");
    }

    terminal.send_input(UP);
    wait_for_prompt_line(&terminal, "> foo");
    terminal.send_input(UP);
    wait_for_prompt_line(&terminal, "> bar");
    terminal.send_input(DOWN);
    wait_for_prompt_line(&terminal, "> foo");
    assert_eq!(shell.input_line().text(), "foo");

    // Recalled text is editable and submits as a new entry.
    terminal.send_input(HOME);
    terminal.send_input(DELETE);
    terminal.send_input(ENTER);
    let event = commands.recv_timeout(WAIT).expect("command");
    assert_eq!(event.command, "oo");
    assert_eq!(event.history, ["oo", "foo", "bar"]);
    shell.shutdown().expect("shutdown");
}

#[test]
fn right_end_and_delete_at_line_end_redraw_exact_bytes() {
    let (terminal, shell) = start(20, ShellConfig::default());
    terminal.type_text("abc");
    terminal.send_input(HOME);
    wait_for_prompt_line(&terminal, "> abc\x1b[3D");
    let before = terminal.writes().len();

    for key in [RIGHT, END, DELETE, RIGHT] {
        terminal.send_input(key);
    }
    assert!(terminal.wait_for(|writes| writes.len() == before + 4));

    let blank = clear_line(20);
    let writes = terminal.writes();
    assert_eq!(
        writes[before..],
        [
            format!("{blank}> abc\x1b[2D"),
            format!("{blank}> abc"),
            format!("{blank}> abc"),
            format!("{blank}> abc"),
        ]
    );
    let line = shell.input_line();
    assert_eq!(line.text(), "abc");
    assert_eq!(line.cursor_offset_from_end(), 0);
    shell.shutdown().expect("shutdown");
}

#[test]
fn enter_on_empty_line_notifies_empty_command() {
    let (terminal, shell) = start(40, ShellConfig::default());
    let commands = shell.command_channel();
    terminal.type_text("x");
    terminal.send_input(ENTER);
    commands.recv_timeout(WAIT).expect("first command");

    terminal.send_input(ENTER);
    let event = commands.recv_timeout(WAIT).expect("empty command");
    assert_eq!(event.command, "");
    assert_eq!(event.history, ["x"]);
    shell.shutdown().expect("shutdown");
}

#[test]
fn submit_echoes_the_line_and_draws_a_fresh_prompt() {
    let (terminal, shell) = start(12, ShellConfig::default().with_prompt("srv> "));
    let commands = shell.command_channel();
    terminal.type_text("ls");
    terminal.send_input(ENTER);
    commands.recv_timeout(WAIT).expect("command");

    let writes = terminal.writes();
    let blank = clear_line(12);
    assert_eq!(
        writes.last().map(String::as_str),
        Some(format!("{blank}srv> ls\r\n{blank}srv> ").as_str())
    );
    shell.shutdown().expect("shutdown");
}

#[test]
fn output_restores_partial_input_and_cursor() {
    let (terminal, shell) = start(20, ShellConfig::default());
    terminal.type_text("stat");
    terminal.send_input(LEFT);
    wait_for_prompt_line(&terminal, "> stat\x1b[1D");

    shell.output_plain("peer joined");
    shell.output_with("disk low", false, Some(Color::Yellow));

    let writes = terminal.writes();
    let blank = clear_line(20);
    assert_eq!(
        writes[writes.len() - 2..],
        [
            format!("{blank}peer joined\r\n> stat\x1b[1D"),
            format!("{blank}\x1b[33mdisk low\x1b[0m\r\n> stat\x1b[1D"),
        ]
    );
    shell.shutdown().expect("shutdown");
}

#[test]
fn timestamped_output_uses_configured_format() {
    let (terminal, shell) = start(
        20,
        ShellConfig::default().with_timestamp_format("T%Y"),
    );
    shell.output("tick");
    let last = terminal.writes().last().cloned().expect("write");
    let year = last
        .split("[T")
        .nth(1)
        .and_then(|rest| rest.split(']').next())
        .expect("timestamp prefix");
    assert_eq!(year.len(), 4);
    assert!(year.chars().all(|ch| ch.is_ascii_digit()));
    assert!(last.contains("] tick\r\n> "));
    shell.shutdown().expect("shutdown");
}

#[test]
fn warning_and_error_are_colored_and_timestamped() {
    let (terminal, shell) = start(20, ShellConfig::default());
    shell.warning("slow");
    shell.error("down");
    let writes = terminal.writes();
    let warning = &writes[writes.len() - 2];
    let error = &writes[writes.len() - 1];
    assert!(warning.contains("\x1b[33m[") && warning.contains("] slow\x1b[0m"));
    assert!(error.contains("\x1b[31m[") && error.contains("] down\x1b[0m"));
    shell.shutdown().expect("shutdown");
}

#[test]
fn set_prompt_redraws_with_the_new_prompt() {
    let (terminal, shell) = start(20, ShellConfig::default());
    terminal.type_text("ab");
    wait_for_prompt_line(&terminal, "> ab");
    shell.set_prompt("$ ").expect("set prompt");
    assert_eq!(
        terminal.writes().last().map(String::as_str),
        Some(format!("{}$ ab", clear_line(20)).as_str())
    );
    assert_eq!(shell.prompt(), "$ ");
    shell.shutdown().expect("shutdown");
}

#[test]
fn unsupported_keys_leave_the_line_untouched() {
    let (terminal, shell) = start(20, ShellConfig::default());
    terminal.type_text("a/b_c");
    terminal.send_input("\x1b[1;5C");
    wait_for_prompt_line(&terminal, "> abc");
    assert_eq!(shell.input_line().text(), "abc");
    shell.shutdown().expect("shutdown");
}

#[test]
fn keypad_digits_are_accepted_in_kitty_mode() {
    let (terminal, shell) = start(20, ShellConfig::default());
    terminal.send_input("\x1b[57400u");
    terminal.send_input("\x1b[57409u");
    terminal.send_input("\x1b[57401u");
    wait_for_prompt_line(&terminal, "> 1.2");
    shell.shutdown().expect("shutdown");
}

#[test]
fn shutdown_restores_the_terminal_once() {
    let (terminal, shell) = start(20, ShellConfig::default());
    let clone = shell.clone();
    shell.shutdown().expect("shutdown");
    clone.shutdown().expect("second shutdown");
    assert_eq!(terminal.stops(), 1);
    assert_eq!(terminal.writes().last().map(String::as_str), Some("\r\n"));

    // Keys after shutdown are not processed.
    let writes = terminal.writes().len();
    terminal.type_text("late");
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(terminal.writes().len(), writes);
}
