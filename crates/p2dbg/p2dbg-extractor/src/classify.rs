//! Orchestrates the four classification rules, in priority order, over a
//! single contiguous scan window copied out of the ring (see `run.rs` for
//! why the extractor always works against an owned, already-linearized
//! buffer rather than the ring's raw two-slice span).

use crate::backtick;
use crate::cog_line;
use crate::debugger_gate::DebuggerFrameGate;
use crate::error::ExtractorError;
use crate::LINE_BUDGET;
use p2dbg_core::{CogIndex, Confidence, MessageKind};

pub struct Classified<'a> {
    pub kind: MessageKind,
    pub payload: &'a [u8],
    pub consumed: usize,
    pub confidence: Confidence,
}

pub enum Outcome<'a> {
    Matched(Classified<'a>),
    /// Not enough bytes yet to decide; the caller should wait for more data
    /// rather than treat this as a classification failure.
    NeedMoreBytes,
}

/// Tracks state that must survive across classification calls: whether the
/// golden-sync `P2_SYSTEM_INIT` line has already been seen since the last
/// reset boundary (only the *first* such line after a reset counts).
#[derive(Default)]
pub struct ExtractorState {
    pub seen_init_since_reset: bool,
}

impl ExtractorState {
    pub fn on_reset_boundary(&mut self) {
        self.seen_init_since_reset = false;
    }
}

fn terminal_output_through_newline(window: &[u8], nl: usize) -> Classified<'_> {
    Classified {
        kind: MessageKind::TerminalOutput,
        payload: &window[..=nl],
        consumed: nl + 1,
        confidence: Confidence::Heuristic,
    }
}

fn terminal_output_budget(window: &[u8]) -> Classified<'_> {
    Classified {
        kind: MessageKind::TerminalOutput,
        payload: &window[..LINE_BUDGET],
        consumed: LINE_BUDGET,
        confidence: Confidence::Heuristic,
    }
}

/// Attempts to classify the longest prefix of `window`. `on_error` receives
/// non-fatal extractor events (line budget overrun, sync loss) for the
/// caller to log/count — these never abort classification.
pub fn classify<'a>(
    window: &'a [u8],
    gate: &mut dyn DebuggerFrameGate,
    state: &mut ExtractorState,
    mut on_error: impl FnMut(ExtractorError),
) -> Outcome<'a> {
    // Rule 1: binary debugger packet.
    if let Some(m) = gate.detect(window) {
        let packet = &window[m.marker_len..m.marker_len + crate::debugger_gate::DEBUGGER_PACKET_LEN];
        let cog = CogIndex::new(packet[0]).expect("gate guarantees first byte in 0..=7");
        return Outcome::Matched(Classified {
            kind: MessageKind::DebuggerPacket(cog),
            payload: packet,
            consumed: m.marker_len + crate::debugger_gate::DEBUGGER_PACKET_LEN,
            confidence: m.confidence,
        });
    }
    if gate.priming(window) {
        if let Some(nl) = memchr::memchr(b'\n', window) {
            on_error(ExtractorError::SyncLost);
            return Outcome::Matched(terminal_output_through_newline(window, nl));
        }
        return Outcome::NeedMoreBytes;
    }

    // Rule 2: cog-tagged text line (and golden sync).
    if let Some(m) = cog_line::match_cog_line(window) {
        let kind = if m.cog_digit == 0 && cog_line::is_golden_sync_body(m.body) && !state.seen_init_since_reset {
            state.seen_init_since_reset = true;
            MessageKind::P2SystemInit
        } else if let Some(cog) = CogIndex::new(m.cog_digit) {
            MessageKind::CogMessage(cog)
        } else {
            MessageKind::InvalidCog
        };
        return Outcome::Matched(Classified {
            kind,
            payload: &window[..m.consumed],
            consumed: m.consumed,
            confidence: Confidence::Matched,
        });
    }

    // Rule 3: backtick command.
    if window.first() == Some(&b'`') {
        match memchr::memchr(b'\n', &window[1..]) {
            Some(rel) => {
                let line_end = 1 + rel;
                let mut body_end = line_end;
                if body_end > 1 && window[body_end - 1] == b'\r' {
                    body_end -= 1;
                }
                let consumed = line_end + 1;
                return match std::str::from_utf8(&window[1..body_end]) {
                    Ok(body) => match backtick::classify(body) {
                        Some(parsed) => Outcome::Matched(Classified {
                            kind: parsed.into_kind(),
                            payload: &window[..consumed],
                            consumed,
                            confidence: Confidence::Matched,
                        }),
                        None => Outcome::Matched(terminal_output_through_newline(window, line_end)),
                    },
                    Err(_) => Outcome::Matched(terminal_output_through_newline(window, line_end)),
                };
            }
            None if window.len() >= LINE_BUDGET => {
                on_error(ExtractorError::LineBudgetExceeded { budget: LINE_BUDGET });
                return Outcome::Matched(terminal_output_budget(window));
            }
            None => return Outcome::NeedMoreBytes,
        }
    }

    // Rule 4: terminal output fallback.
    if let Some(nl) = memchr::memchr(b'\n', window) {
        return Outcome::Matched(terminal_output_through_newline(window, nl));
    }
    if window.len() >= LINE_BUDGET {
        on_error(ExtractorError::LineBudgetExceeded { budget: LINE_BUDGET });
        return Outcome::Matched(terminal_output_budget(window));
    }
    Outcome::NeedMoreBytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger_gate::SentinelGate;

    fn noop(_: ExtractorError) {}

    #[test]
    fn classifies_cog_message() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = b"Cog3  hello\r\n";
        match classify(window, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => {
                assert_eq!(c.kind, MessageKind::CogMessage(CogIndex::new(3).unwrap()));
                assert_eq!(c.payload, window);
                assert_eq!(c.consumed, window.len());
            }
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
    }

    #[test]
    fn single_space_cog_falls_to_terminal_output() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = b"Cog0 hi\n";
        match classify(window, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => assert_eq!(c.kind, MessageKind::TerminalOutput),
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
    }

    #[test]
    fn golden_sync_only_fires_once_per_reset() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let line: &[u8] = b"Cog0  INIT $0000_0000 $0000_0000 load\r\n";

        match classify(line, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => assert_eq!(c.kind, MessageKind::P2SystemInit),
            _ => panic!("expected a match"),
        }
        match classify(line, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => assert_eq!(c.kind, MessageKind::CogMessage(CogIndex::new(0).unwrap())),
            _ => panic!("expected a match"),
        }

        state.on_reset_boundary();
        match classify(line, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => assert_eq!(c.kind, MessageKind::P2SystemInit),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn invalid_cog_digit_out_of_range() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = b"Cog8  hi\n";
        match classify(window, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => {
                assert_eq!(c.kind, MessageKind::InvalidCog);
                assert_eq!(c.payload, b"Cog8  hi\n");
            }
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
    }

    #[test]
    fn waits_for_more_bytes_on_unterminated_line_under_budget() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = b"partial line with no terminator yet";
        match classify(window, &mut gate, &mut state, noop) {
            Outcome::NeedMoreBytes => {}
            Outcome::Matched(_) => panic!("expected to wait for more bytes"),
        }
    }

    #[test]
    fn line_budget_overrun_emits_terminal_output_and_reports() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = vec![b'x'; LINE_BUDGET + 1];
        let mut errors = Vec::new();
        match classify(&window, &mut gate, &mut state, |e| errors.push(e)) {
            Outcome::Matched(c) => {
                assert_eq!(c.kind, MessageKind::TerminalOutput);
                assert_eq!(c.consumed, LINE_BUDGET);
                assert_eq!(c.confidence, Confidence::Heuristic);
            }
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ExtractorError::LineBudgetExceeded { .. }));
    }

    #[test]
    fn debugger_packet_is_matched() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let mut window = vec![0xFFu8, 5];
        window.extend(std::iter::repeat(0u8).take(crate::debugger_gate::DEBUGGER_PACKET_LEN - 1));
        match classify(&window, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => {
                assert_eq!(c.kind, MessageKind::DebuggerPacket(CogIndex::new(5).unwrap()));
                assert_eq!(c.consumed, 1 + crate::debugger_gate::DEBUGGER_PACKET_LEN);
            }
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
    }

    #[test]
    fn marker_interrupted_by_newline_is_sync_loss() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();
        let window = b"\xFFsomething\n";
        let mut errors = Vec::new();
        match classify(window, &mut gate, &mut state, |e| errors.push(e)) {
            Outcome::Matched(c) => assert_eq!(c.kind, MessageKind::TerminalOutput),
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
        assert!(matches!(errors[0], ExtractorError::SyncLost));
    }

    #[test]
    fn backtick_create_and_update() {
        let mut gate = SentinelGate::default();
        let mut state = ExtractorState::default();

        let create = b"`scope ch1 400 300 100\n";
        match classify(create, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => assert!(matches!(c.kind, MessageKind::BacktickCreate { .. })),
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }

        let update = b"`ch1 ch2 0,1,2\n";
        match classify(update, &mut gate, &mut state, noop) {
            Outcome::Matched(c) => match c.kind {
                MessageKind::BacktickUpdate { names } => assert_eq!(names.len(), 2),
                _ => panic!("expected BacktickUpdate"),
            },
            Outcome::NeedMoreBytes => panic!("expected a match"),
        }
    }
}
