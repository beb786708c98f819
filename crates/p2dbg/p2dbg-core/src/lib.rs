//! `p2dbg-core`: shared data model for the P2 debug terminal ingestion
//! pipeline.
//!
//! This crate has no downstream behavior of its own — it is the common
//! vocabulary (`MessageKind`, pool slot headers, window identities, the
//! window-handler contract, reset events, and process-wide metrics) that
//! `p2dbg-ring`, `p2dbg-pool`, `p2dbg-extractor`, `p2dbg-router`,
//! `p2dbg-reset`, and `p2dbg-record` all share.

mod byte_span;
mod clock;
mod message_kind;
mod metrics;
mod reset;
mod router_command;
mod router_message;
mod slot;
mod window_handler;
mod window_id;

pub use byte_span::ByteSpan;
pub use clock::now_ns;
pub use message_kind::{CogIndex, Confidence, MessageKind, WindowType};
pub use metrics::Metrics;
pub use reset::{ControlLine, ResetEvent};
pub use router_command::RouterCommand;
pub use router_message::RouterMessage;
pub use slot::{SlotHeader, SlotId, MAX_PAYLOAD_LEN};
pub use window_handler::{HandlerError, WindowCreator, WindowHandler};
pub use window_id::WindowId;
