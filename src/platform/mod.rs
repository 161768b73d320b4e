//! Platform-specific terminal integrations.

pub mod process_terminal;
pub mod sequence_buffer;

pub use process_terminal::ProcessTerminal;
#[cfg(unix)]
pub use process_terminal::{
    install_panic_hook, install_signal_handlers, PanicHookGuard, SignalHookGuard,
};
