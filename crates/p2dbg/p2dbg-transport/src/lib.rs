//! `p2dbg-transport`: the serial transport (component C1) — opens the
//! device, drives reset pulses, and feeds the shared ring with no parsing on
//! the read path.

mod autobaud;
mod error;
mod transport;

pub use error::TransportError;
pub use transport::{ControlHandle, ReaderHandle, SerialTransport};
