//! Process signal handling: `SIGUSR1` pulses the configured control line,
//! `SIGTERM`/`SIGINT` request graceful shutdown.

use p2dbg_core::ResetEvent;
use p2dbg_transport::ControlHandle;
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Spawns the thread that blocks on the process's signal mask and reacts to
/// `SIGUSR1`/`SIGTERM`/`SIGINT`. `shutdown` is the same flag every other
/// component's `cancel` shares.
pub fn spawn(
    mut control: ControlHandle,
    reset_tx: SyncSender<ResetEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGUSR1, SIGTERM, SIGINT])?;
    Ok(std::thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGUSR1 => {
                    info!("SIGUSR1 received, pulsing reset");
                    if let Err(e) = control.pulse_reset(&reset_tx, p2dbg_core::now_ns) {
                        warn!(error = %e, "signal-triggered reset pulse failed");
                    }
                }
                SIGTERM | SIGINT => {
                    info!(signal, "shutdown signal received, draining pipeline");
                    shutdown.store(true, Ordering::Release);
                    break;
                }
                _ => {}
            }
        }
    }))
}
