use p2dbg_core::WindowId;
use thiserror::Error;

/// Hot-path router errors — recovered locally and surfaced as `Metrics`
/// counters + `tracing` events, never propagated out of the router's own
/// run loop.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("destination window '{0}' is not registered")]
    UnknownDestination(WindowId),

    #[error("pre-ready queue for window '{0}' is full, message dropped")]
    QueueFull(WindowId),

    #[error("handler for window '{0}' failed")]
    HandlerFailed(WindowId),
}
