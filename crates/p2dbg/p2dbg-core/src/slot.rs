use crate::message_kind::{Confidence, MessageKind};

/// Maximum payload a single pool slot may hold.
pub const MAX_PAYLOAD_LEN: usize = 65_535;

/// Index into the message pool's slab. Slot ids are reused once released —
/// callers must not hold one past the `release` call that frees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// The fixed-size portion of a pool slot: everything except the payload
/// bytes themselves. `ref_count` is modelled as a plain ownership marker
/// (0 or 1), not an atomic refcount — the pool never shares a slot between
/// two owners at once (see `p2dbg-pool`'s module docs).
#[derive(Debug, Clone)]
pub struct SlotHeader {
    pub kind: MessageKind,
    pub payload_len: usize,
    pub arrival_timestamp_ns: u64,
    pub ref_count: u8,
    pub confidence: Confidence,
}

impl SlotHeader {
    pub fn new(kind: MessageKind, payload_len: usize, arrival_timestamp_ns: u64, confidence: Confidence) -> Self {
        Self {
            kind,
            payload_len,
            arrival_timestamp_ns,
            ref_count: 1,
            confidence,
        }
    }
}
