use crate::window_handler::WindowHandler;
use crate::window_id::WindowId;

/// The registration/control command channel other threads use to talk to
/// the window registry the router thread owns exclusively. Drained inline
/// on the router thread before each dispatch pass — two-phase registration
/// and single-thread ownership of every window, in one place.
pub enum RouterCommand {
    /// Creates a not-ready registry entry so early messages can start
    /// queuing (pre-ready queue) before the handler itself exists.
    RegisterInstance(WindowId),
    /// Attaches the callable handler to an existing (or new) instance and
    /// transitions it to ready, draining its pre-ready queue in order.
    RegisterHandler(WindowId, Box<dyn WindowHandler>),
    /// Removes a window entry, calling its handler's `on_close` first.
    Unregister(WindowId),
    /// Fires `on_rotate` on every registered handler — the reset
    /// coordinator's `rotate_log` event, or a `P2_SYSTEM_INIT` golden sync.
    Rotate,
}
