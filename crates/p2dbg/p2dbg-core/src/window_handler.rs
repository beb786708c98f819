use crate::message_kind::MessageKind;
use crate::message_kind::WindowType;
use crate::window_id::WindowId;
use thiserror::Error;

/// Error a window handler may raise from `handle`. Isolated per destination
/// by the router: one handler's error never stops delivery to the others.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler rejected payload: {0}")]
    Rejected(String),
    #[error("handler is not ready to accept messages")]
    NotReady,
}

/// The contract every visualization window (or core-owned default
/// destination, e.g. the central log) implements. Handlers run synchronously
/// on the router thread: they must not block on disk or network, and must
/// not retain `payload` past the call — the pool slot backing it is released
/// once the router has finished iterating all of a message's destinations.
pub trait WindowHandler: Send {
    fn handle(&mut self, kind: &MessageKind, payload: &[u8], arrival_ns: u64) -> Result<(), HandlerError>;

    /// Called once when the window transitions from registered-but-not-ready
    /// to ready, just before its pre-ready queue is drained.
    fn on_ready(&mut self) {}

    /// Called once when the window is unregistered.
    fn on_close(&mut self) {}

    /// Called when a log rotation fires — an explicit `rotate_log` event from
    /// the reset coordinator, or a `P2_SYSTEM_INIT` golden sync. Windows that
    /// want to clear their buffers on rotation override this; the default
    /// no-op is how a window opts out.
    fn on_rotate(&mut self) {}
}

/// The single contract the backtick `CREATE` command's "window creator"
/// external factory must implement — treated as an external collaborator,
/// out of scope for this crate. Missing creator is tolerated — the router
/// logs and drops the CREATE.
pub trait WindowCreator: Send {
    fn create_window(&mut self, window_type: WindowType, name: &WindowId);
}
