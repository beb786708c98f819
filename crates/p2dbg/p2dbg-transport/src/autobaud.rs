/// Detects the P2 auto-baud acknowledgement by watching a small rolling
/// window of the incoming byte stream, without removing anything from the
/// stream the ring sees — the read thread feeds every byte to both the ring
/// and this detector.
///
/// The P2 ROM loader's ack is a short fixed byte run; the exact bytes are
/// device-specific and unconfirmed here, so the pattern is an injectable
/// constant rather than a hardcoded guess.
pub struct AutobaudDetector {
    pattern: Vec<u8>,
    window: Vec<u8>,
    observed: bool,
}

impl AutobaudDetector {
    pub fn new(pattern: Vec<u8>) -> Self {
        Self {
            window: Vec::with_capacity(pattern.len().max(1) * 2),
            pattern,
            observed: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        if self.observed || self.pattern.is_empty() {
            return;
        }
        self.window.extend_from_slice(bytes);
        let keep_from = self.window.len().saturating_sub(self.pattern.len() * 2);
        if keep_from > 0 {
            self.window.drain(..keep_from);
        }
        if self.window.windows(self.pattern.len()).any(|w| w == self.pattern.as_slice()) {
            self.observed = true;
        }
    }

    pub fn observed(&self) -> bool {
        self.observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pattern_split_across_feeds() {
        let mut d = AutobaudDetector::new(vec![0x15, 0x15, 0x15, 0x15]);
        d.feed(&[0x01, 0x15, 0x15]);
        assert!(!d.observed());
        d.feed(&[0x15, 0x15, 0x02]);
        assert!(d.observed());
    }
}
