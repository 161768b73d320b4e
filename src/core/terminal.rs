//! Terminal trait and lifecycle helpers.

/// Minimal terminal interface for the shell.
///
/// Implementations are moved into the shell's gate and driven from two
/// threads (key loop and output callers), hence `Send`.
pub trait Terminal: Send {
    /// Start the terminal. `on_input` receives one complete key sequence per call,
    /// from the terminal's own input thread.
    fn start(&mut self, on_input: Box<dyn FnMut(String) + Send>) -> std::io::Result<()>;

    /// Stop the terminal and restore state.
    fn stop(&mut self) -> std::io::Result<()>;

    /// Write output to the terminal. Failures are fatal.
    fn write(&mut self, data: &str);

    /// Terminal width in columns.
    fn columns(&self) -> u16;
}

impl<T: Terminal + ?Sized> Terminal for Box<T> {
    fn start(&mut self, on_input: Box<dyn FnMut(String) + Send>) -> std::io::Result<()> {
        (**self).start(on_input)
    }

    fn stop(&mut self) -> std::io::Result<()> {
        (**self).stop()
    }

    fn write(&mut self, data: &str) {
        (**self).write(data)
    }

    fn columns(&self) -> u16 {
        (**self).columns()
    }
}

/// RAII guard that stops the terminal on drop.
pub struct TerminalGuard<T: Terminal> {
    terminal: Option<T>,
}

impl<T: Terminal> TerminalGuard<T> {
    pub fn new(terminal: T) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }

    /// Access the wrapped terminal.
    pub fn terminal_mut(&mut self) -> Option<&mut T> {
        self.terminal.as_mut()
    }
}

impl<T: Terminal> Drop for TerminalGuard<T> {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.as_mut() {
            let _ = terminal.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Terminal, TerminalGuard};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTerminal {
        stops: Arc<AtomicUsize>,
    }

    impl Terminal for CountingTerminal {
        fn start(&mut self, _on_input: Box<dyn FnMut(String) + Send>) -> std::io::Result<()> {
            Ok(())
        }
        fn stop(&mut self) -> std::io::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn write(&mut self, _data: &str) {}
        fn columns(&self) -> u16 {
            80
        }
    }

    #[test]
    fn guard_stops_terminal_on_drop() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let _guard = TerminalGuard::new(CountingTerminal {
                stops: Arc::clone(&stops),
            });
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
