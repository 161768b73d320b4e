//! Process-based terminal implementation (stdin/stdout in raw mode).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::EnvConfig;
use crate::core::terminal::Terminal;
use crate::platform::sequence_buffer::SequenceBuffer;

#[cfg(unix)]
use libc::{self, c_int};
#[cfg(unix)]
use signal_hook::iterator::Signals;

const ESCAPE_TIMEOUT_MS: u64 = 10;
const INPUT_POLL_MS: i32 = 50;

type InputHandler = Box<dyn FnMut(String) + Send>;

#[cfg(unix)]
fn wait_writable(fd: c_int) -> std::io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }

        return Err(std::io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

#[cfg(unix)]
fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> std::io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> std::io::Result<usize>,
    FWait: FnMut(c_int) -> std::io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "write returned 0",
                ));
            }
            Ok(count) => {
                if count > bytes.len() - written {
                    return Err(std::io::Error::other(
                        "write returned more bytes than requested",
                    ));
                }
                written += count;
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_fd(fd: c_int, data: &str) {
    if data.is_empty() {
        return;
    }

    let result = write_all_fd_with(
        fd,
        data.as_bytes(),
        |fd, buf| {
            let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(std::io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    );
    if let Err(err) = result {
        panic!("failed to write to terminal: {err}");
    }
}

#[cfg(unix)]
fn read_columns(fd: c_int) -> Option<u16> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 {
        Some(size.ws_col)
    } else {
        None
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> std::io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> std::io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Restores the cooked-mode termios captured before entering raw mode.
///
/// Runs at most once; shared between `stop()`, the signal thread and the panic hook.
#[cfg(unix)]
#[derive(Clone)]
struct TermiosRestore {
    fd: c_int,
    original: libc::termios,
    ran: Arc<AtomicBool>,
}

#[cfg(unix)]
impl TermiosRestore {
    fn run(&self) -> std::io::Result<()> {
        if self.ran.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        set_termios(self.fd, &self.original)
    }
}

#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    restore: Option<TermiosRestore>,
    input_handler: Arc<Mutex<Option<InputHandler>>>,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    write_log_path: Option<PathBuf>,
    write_log_failed: bool,
    install_cleanup_hooks: bool,
    signal_hook_guard: Option<SignalHookGuard>,
    panic_hook_guard: Option<PanicHookGuard>,
}

#[cfg(unix)]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            restore: None,
            input_handler: Arc::new(Mutex::new(None)),
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            write_log_path: EnvConfig::from_env().write_log.map(PathBuf::from),
            write_log_failed: false,
            install_cleanup_hooks: true,
            signal_hook_guard: None,
            panic_hook_guard: None,
        }
    }

    /// Append every write to `path` (in addition to the terminal).
    pub fn with_write_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.write_log_path = Some(path.into());
        self.write_log_failed = false;
        self
    }

    /// Whether `start()` installs SIGINT/SIGTERM and panic hooks that restore termios.
    pub fn with_cleanup_hooks(mut self, enabled: bool) -> Self {
        self.install_cleanup_hooks = enabled;
        self
    }

    fn enable_raw_mode(&mut self) -> std::io::Result<()> {
        let original = match self.restore.as_ref() {
            Some(restore) => restore.original,
            None => get_termios(self.stdin_fd)?,
        };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        // Keep Ctrl-C / Ctrl-\ delivering signals to the host process.
        raw.c_lflag |= libc::ISIG;
        set_termios(self.stdin_fd, &raw)?;

        self.restore = Some(TermiosRestore {
            fd: self.stdin_fd,
            original,
            ran: Arc::new(AtomicBool::new(false)),
        });
        Ok(())
    }

    fn start_input_thread(&mut self) {
        let stdin_fd = self.stdin_fd;
        let input_handler = Arc::clone(&self.input_handler);
        let stop_flag = Arc::clone(&self.stop_flag);

        let spawned = thread::Builder::new()
            .name("duplex-shell-stdin".to_string())
            .spawn(move || {
                let mut buffer = [0u8; 4096];
                let mut sequences = SequenceBuffer::new(ESCAPE_TIMEOUT_MS);

                while !stop_flag.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    let timeout_ms = sequences.next_timeout_ms(now, INPUT_POLL_MS);
                    let batch = if poll_readable(stdin_fd, timeout_ms) {
                        let read_len = unsafe {
                            libc::read(stdin_fd, buffer.as_mut_ptr() as *mut _, buffer.len())
                        };
                        if read_len <= 0 {
                            Vec::new()
                        } else {
                            sequences.process(&buffer[..read_len as usize])
                        }
                    } else {
                        sequences.flush_due(now)
                    };

                    if batch.is_empty() {
                        continue;
                    }

                    let mut handler = input_handler
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if let Some(handler) = handler.as_mut() {
                        for sequence in batch {
                            handler(sequence);
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => self.input_thread = Some(handle),
            Err(err) => panic!("failed to spawn stdin thread: {err}"),
        }
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn install_hooks(&mut self) -> std::io::Result<()> {
        let Some(restore) = self.restore.clone() else {
            return Ok(());
        };
        let on_signal = restore.clone();
        self.signal_hook_guard = Some(install_signal_handlers(move |signal| {
            let _ = on_signal.run();
            std::process::exit(128 + signal);
        })?);
        self.panic_hook_guard = Some(install_panic_hook(move || {
            let _ = restore.run();
        }));
        Ok(())
    }
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl Terminal for ProcessTerminal {
    fn start(&mut self, on_input: InputHandler) -> std::io::Result<()> {
        *self
            .input_handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(on_input);
        self.stop_flag.store(false, Ordering::SeqCst);

        if let Err(err) = self.enable_raw_mode() {
            *self
                .input_handler
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
            return Err(err);
        }

        if self.install_cleanup_hooks {
            self.install_hooks()?;
        }
        self.start_input_thread();
        Ok(())
    }

    fn stop(&mut self) -> std::io::Result<()> {
        self.stop_input_thread();
        *self
            .input_handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        self.signal_hook_guard = None;
        self.panic_hook_guard = None;

        // Flush input before leaving raw mode so buffered keys don't leak to the parent shell.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };

        match self.restore.take() {
            Some(restore) => restore.run(),
            None => Ok(()),
        }
    }

    fn write(&mut self, data: &str) {
        write_fd(self.stdout_fd, data);
        if self.write_log_failed {
            return;
        }
        if let Some(path) = self.write_log_path.as_ref() {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(data.as_bytes()));
            if let Err(err) = result {
                tracing::warn!(path = %path.display(), error = %err, "terminal write log disabled");
                self.write_log_failed = true;
            }
        }
    }

    fn columns(&self) -> u16 {
        read_columns(self.stdout_fd).unwrap_or(80)
    }
}

/// Guard for the SIGINT/SIGTERM cleanup thread.
#[cfg(unix)]
pub struct SignalHookGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl Drop for SignalHookGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Install a SIGINT/SIGTERM hook; `cleanup` receives the signal number.
#[cfg(unix)]
pub fn install_signal_handlers<F>(cleanup: F) -> std::io::Result<SignalHookGuard>
where
    F: Fn(i32) + Send + 'static,
{
    let mut signals = Signals::new([libc::SIGINT, libc::SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("duplex-shell-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                cleanup(signal);
            }
        })?;

    Ok(SignalHookGuard {
        handle,
        thread: Some(thread),
    })
}

/// Panic hook guard. The hook stays installed for the process lifetime; dropping the
/// guard only disarms its cleanup.
#[cfg(unix)]
pub struct PanicHookGuard {
    armed: Arc<AtomicBool>,
}

#[cfg(unix)]
impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

/// Install a panic hook that runs `cleanup` once, then delegates to the previous hook.
#[cfg(unix)]
pub fn install_panic_hook<F>(cleanup: F) -> PanicHookGuard
where
    F: Fn() + Send + Sync + 'static,
{
    let armed = Arc::new(AtomicBool::new(true));
    let hook_armed = Arc::clone(&armed);
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if hook_armed.swap(false, Ordering::SeqCst) {
            cleanup();
        }
        previous(info);
    }));
    PanicHookGuard { armed }
}

#[cfg(not(unix))]
pub struct ProcessTerminal;

#[cfg(not(unix))]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Terminal for ProcessTerminal {
    fn start(&mut self, _on_input: InputHandler) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "ProcessTerminal is only supported on Unix platforms",
        ))
    }

    fn stop(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn write(&mut self, _data: &str) {
        panic!("ProcessTerminal is only supported on Unix platforms");
    }

    fn columns(&self) -> u16 {
        80
    }
}
