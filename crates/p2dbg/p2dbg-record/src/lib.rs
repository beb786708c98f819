//! `p2dbg-record`: the recorder/player pair (component C7). The recorder
//! taps the transport's inbound path and writes a `.p2rec` file; the player
//! loads one back and replays it through the same ring-producer entry point
//! the transport uses, so downstream components cannot tell the two apart.

mod error;
mod format;
mod player;
mod recorder;

pub use error::RecordError;
pub use format::{Entry, Metadata, DATA_TYPE_RAW_BYTES};
pub use player::{spawn as spawn_player, Player, PlayerCommand};
pub use recorder::{Recorder, RecorderTap};
