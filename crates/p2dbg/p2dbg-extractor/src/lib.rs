//! `p2dbg-extractor`: the autonomous classification thread (component C3).
//!
//! Runs the four classification rules (binary debugger packet, cog-tagged
//! line, backtick command, terminal-output fallback), in priority order,
//! over bytes pulled from `p2dbg-ring` and hands classified messages to
//! `p2dbg-pool`, forwarding slot ids (and reset boundaries) to the router
//! over a bounded channel.

mod backtick;
mod classify;
mod cog_line;
mod debugger_gate;
mod error;
mod run;

/// The line-budget / payload cap: the 64 KiB line budget and the pool's
/// 65,535-byte payload cap are the same number in practice (see DESIGN.md).
pub(crate) const LINE_BUDGET: usize = p2dbg_core::MAX_PAYLOAD_LEN;

pub use backtick::reparse_update;
pub use debugger_gate::{DebuggerFrameGate, DebuggerFrameMatch, SentinelGate, DEBUGGER_PACKET_LEN};
pub use error::ExtractorError;
pub use run::Extractor;
