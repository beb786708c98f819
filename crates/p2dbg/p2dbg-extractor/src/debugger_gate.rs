/// What a debugger-frame gate found at the start of the unconsumed window.
#[derive(Debug, Clone, Copy)]
pub struct DebuggerFrameMatch {
    /// Bytes to skip before the 416-byte packet itself starts (the marker).
    pub marker_len: usize,
    pub confidence: p2dbg_core::Confidence,
}

/// Opens the "window of validity" classification rule 1 (debugger packet)
/// needs. The P2-side handshake that truly opens/closes this window is
/// external to this core; implementations that have it can supply a
/// stricter gate here without changing the extractor's structure.
/// `SentinelGate` is a degraded heuristic fallback for when it isn't.
pub trait DebuggerFrameGate: Send {
    fn detect(&mut self, window: &[u8]) -> Option<DebuggerFrameMatch>;

    /// True if `window` opens this gate's marker but doesn't yet carry
    /// enough bytes for `detect` to decide — the caller should wait for
    /// more data (or, if a line terminator shows up first, treat the
    /// partial run as a sync-loss flush) rather than falling through to the
    /// other classification rules.
    fn priming(&self, window: &[u8]) -> bool {
        let _ = window;
        false
    }
}

/// Default gate: a single reserved marker byte immediately preceding the
/// 416-byte run opens a one-shot window, consumed by the very next
/// classification attempt. Always reports `HEURISTIC` confidence, since no
/// P2-side acknowledgement confirms the frame boundary.
pub struct SentinelGate {
    pub marker: u8,
}

impl Default for SentinelGate {
    fn default() -> Self {
        Self { marker: 0xFF }
    }
}

pub const DEBUGGER_PACKET_LEN: usize = 416;

impl DebuggerFrameGate for SentinelGate {
    fn detect(&mut self, window: &[u8]) -> Option<DebuggerFrameMatch> {
        if window.len() < 1 + DEBUGGER_PACKET_LEN {
            return None;
        }
        if window[0] != self.marker {
            return None;
        }
        let first_byte = window[1];
        if !(0..=7).contains(&first_byte) {
            return None;
        }
        Some(DebuggerFrameMatch {
            marker_len: 1,
            confidence: p2dbg_core::Confidence::Heuristic,
        })
    }

    fn priming(&self, window: &[u8]) -> bool {
        window.first() == Some(&self.marker) && window.len() < 1 + DEBUGGER_PACKET_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_marker_then_valid_cog_byte() {
        let mut gate = SentinelGate::default();
        let mut window = vec![0xFFu8];
        window.push(5);
        window.extend(std::iter::repeat(0u8).take(DEBUGGER_PACKET_LEN - 1));
        let m = gate.detect(&window).unwrap();
        assert_eq!(m.marker_len, 1);
    }

    #[test]
    fn rejects_missing_marker() {
        let mut gate = SentinelGate::default();
        let mut window = vec![0x00u8, 5];
        window.extend(std::iter::repeat(0u8).take(DEBUGGER_PACKET_LEN - 1));
        assert!(gate.detect(&window).is_none());
    }

    #[test]
    fn rejects_out_of_range_first_byte() {
        let mut gate = SentinelGate::default();
        let mut window = vec![0xFFu8, 9];
        window.extend(std::iter::repeat(0u8).take(DEBUGGER_PACKET_LEN - 1));
        assert!(gate.detect(&window).is_none());
    }
}
