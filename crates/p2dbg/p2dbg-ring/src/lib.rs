//! `p2dbg-ring`: the lock-free single-producer/single-consumer byte ring
//! between the serial transport and the extractor (component C2).
//!
//! Atomic head/tail with power-of-two masking, no seqlock and no
//! shared-memory file header, since here there is exactly one writer and one
//! reader in the same process rather than N cross-process readers racing a
//! writer over a typed slot.

mod config;
mod ring;

pub use config::{RingConfig, DEFAULT_CAPACITY};
pub use ring::{channel, Overflow, ReadableSpan, RingConsumer, RingProducer};
