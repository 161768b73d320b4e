//! Echo shell: a background producer prints status lines while you type.
//!
//! Commands: `status`, `warn <text>`, `fail <text>`, `history`, `quit`.
//! Set `DUPLEX_SHELL_LOG_FILE` to also log to a file and mirror host events.

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use duplex_shell::logging::{build_subscriber, ShellLogLayer};
use duplex_shell::{EnvConfig, Shell, ShellConfig};
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvConfig::from_env();
    let config = env.apply(ShellConfig::default().with_prompt("echo> "));
    let shell = Shell::new(config)?;

    if let Some(path) = env.log_file.as_deref() {
        let log_file = File::create(path)?;
        build_subscriber(log_file, Some(ShellLogLayer::new(shell.clone()))).try_init()?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let producer = {
        let shell = shell.clone();
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut tick = 0u64;
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_secs(3));
                tick += 1;
                shell.output(&format!("heartbeat {tick}"));
                if tick % 5 == 0 {
                    tracing::warn!(target: "echo_shell::producer", tick, "slow heartbeat");
                }
            }
        })
    };

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let handle = shell.clone();
    shell.on_command(move |event| {
        let (verb, rest) = event
            .command
            .split_once(' ')
            .unwrap_or((event.command.as_str(), ""));
        match verb {
            "" => {}
            "status" => handle.output_plain(&format!("{} commands in history", event.history.len())),
            "warn" => handle.warning(rest),
            "fail" => handle.error(rest),
            "history" => {
                for (index, entry) in event.history.iter().enumerate() {
                    handle.output_plain(&format!("{index:>3}  {entry}"));
                }
            }
            "quit" => {
                let _ = done_tx.send(());
            }
            _ => handle.output(&format!("echo: {}", event.command)),
        }
    });

    let _ = done_rx.recv();
    running.store(false, Ordering::SeqCst);
    shell.shutdown()?;
    let _ = producer.join();
    Ok(())
}
