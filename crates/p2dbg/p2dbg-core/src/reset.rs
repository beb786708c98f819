/// Which hardware control line a reset pulse used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum ControlLine {
    Dtr,
    Rts,
}

/// A reset boundary, travelling in-band through the same queue as regular
/// classified messages (see `p2dbg-router`) so ordering across the boundary
/// is guaranteed without a separate synchronization path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetEvent {
    pub kind: ControlLine,
    pub timestamp_ns: u64,
    pub sequence: u64,
}
