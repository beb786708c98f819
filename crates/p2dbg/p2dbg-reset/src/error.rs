use thiserror::Error;

/// Non-fatal: reported via `tracing` + `Stats`, never propagated. On
/// timeout, the coordinator logs the drain-timeout event and proceeds.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("router did not confirm draining boundary {sequence} within {timeout_ms}ms")]
    DrainTimeout { sequence: u64, timeout_ms: u64 },
}
