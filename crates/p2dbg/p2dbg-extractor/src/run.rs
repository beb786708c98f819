//! The extractor's own thread (component C3): autonomous, no request/reply
//! handshake with anything else — it pulls from the ring, classifies,
//! allocates a pool slot, and forwards the slot id (or a reset boundary) to
//! the router over the boundary channel.

use crate::classify::{self, ExtractorState, Outcome};
use crate::debugger_gate::DebuggerFrameGate;
use crate::error::ExtractorError;
use crate::LINE_BUDGET;
use p2dbg_core::{now_ns, Metrics, ResetEvent, RouterMessage, SlotHeader};
use p2dbg_pool::MessagePool;
use p2dbg_ring::RingConsumer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(50);
const POOL_WAIT: Duration = Duration::from_secs(5);

fn report(metrics: &Metrics, err: ExtractorError) {
    match err {
        ExtractorError::LineBudgetExceeded { budget } => {
            warn!(budget, "line budget exceeded, flushing as terminal output");
        }
        ExtractorError::SyncLost => {
            metrics.inc_overflow(); // sync loss is reported through the same "something got dropped" lens
            warn!("classification lost sync, flushing partial bytes");
        }
    }
}

/// Runs the extractor loop until the ring closes and drains, or `cancel` is
/// set. Consumes `self` — the caller spawns this on its own thread.
pub struct Extractor {
    consumer: RingConsumer,
    pool: MessagePool,
    router_tx: SyncSender<RouterMessage>,
    boundary_rx: Receiver<ResetEvent>,
    metrics: Arc<Metrics>,
    gate: Box<dyn DebuggerFrameGate>,
    cancel: Arc<AtomicBool>,
}

impl Extractor {
    pub fn new(
        consumer: RingConsumer,
        pool: MessagePool,
        router_tx: SyncSender<RouterMessage>,
        boundary_rx: Receiver<ResetEvent>,
        metrics: Arc<Metrics>,
        gate: Box<dyn DebuggerFrameGate>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            consumer,
            pool,
            router_tx,
            boundary_rx,
            metrics,
            gate,
            cancel,
        }
    }

    pub fn run(mut self) {
        let mut state = ExtractorState::default();
        let mut scratch = Vec::with_capacity(LINE_BUDGET);

        loop {
            if self.cancel.load(Ordering::Acquire) {
                break;
            }

            if self.drain_boundary(&mut state, &mut scratch) == ControlFlow::Stop {
                break;
            }

            let span = self.consumer.readable_span();
            if span.is_empty() {
                if self.consumer.is_closed() {
                    break;
                }
                self.consumer.wait_for_data(POLL_TIMEOUT);
                continue;
            }

            match self.classify_and_publish_one(&mut state, &mut scratch) {
                Step::Matched => {}
                Step::Stop => break,
                Step::NeedMoreBytes { scanned_whole_span } => {
                    if !scanned_whole_span {
                        continue;
                    }
                    if self.consumer.is_closed() {
                        self.flush_remainder(&mut scratch);
                        break;
                    }
                    self.consumer.wait_for_data(POLL_TIMEOUT);
                }
            }
        }
    }

    /// Attempts one classification pass over the current readable span,
    /// publishing a pool slot and forwarding it to the router on a match.
    /// Returns without blocking on new bytes — callers decide what to do
    /// when more data is needed.
    fn classify_and_publish_one(&mut self, state: &mut ExtractorState, scratch: &mut Vec<u8>) -> Step {
        let span = self.consumer.readable_span();
        if span.is_empty() {
            return Step::NeedMoreBytes { scanned_whole_span: true };
        }
        let scan_len = span.len().min(LINE_BUDGET);
        self.consumer.copy_into(scan_len, scratch);

        let metrics = &self.metrics;
        match classify::classify(scratch, self.gate.as_mut(), state, |e| report(metrics, e)) {
            Outcome::Matched(c) => {
                let Some(slot_id) = self.pool.allocate_blocking(POOL_WAIT) else {
                    warn!("pool exhausted past the wait timeout, retrying");
                    return Step::Matched;
                };
                let header = SlotHeader::new(c.kind.clone(), c.payload.len(), now_ns(), c.confidence);
                if let Err(e) = self.pool.publish(slot_id, header, c.payload) {
                    warn!(error = %e, "failed to publish classified message, dropping");
                    self.pool.release(slot_id);
                    self.consumer.consume(c.consumed);
                    return Step::Matched;
                }
                self.consumer.consume(c.consumed);
                self.metrics.inc_messages_out();
                if self.router_tx.send(RouterMessage::Slot(slot_id)).is_err() {
                    info!("router channel closed, extractor shutting down");
                    self.pool.release(slot_id);
                    return Step::Stop;
                }
                Step::Matched
            }
            Outcome::NeedMoreBytes => Step::NeedMoreBytes { scanned_whole_span: scan_len == span.len() },
        }
    }

    /// Drains any pending reset boundary: classifies every real message
    /// still sitting unconsumed in the ring first (a complete `Cog3  ...`
    /// line or backtick command can legitimately be waiting here — the
    /// boundary arrives on a separate channel from byte arrival), then
    /// flushes only the genuine unmatched/partial remainder as
    /// `TERMINAL_OUTPUT`, clears binary classification state, and finally
    /// forwards the marker — preserving in-order delivery through the same
    /// channel regular messages travel.
    fn drain_boundary(&mut self, state: &mut ExtractorState, scratch: &mut Vec<u8>) -> ControlFlow {
        match self.boundary_rx.try_recv() {
            Ok(event) => {
                loop {
                    match self.classify_and_publish_one(state, scratch) {
                        Step::Matched => continue,
                        Step::Stop => return ControlFlow::Stop,
                        Step::NeedMoreBytes { .. } => break,
                    }
                }
                if self.flush_remainder(scratch) == ControlFlow::Stop {
                    return ControlFlow::Stop;
                }
                state.on_reset_boundary();
                if self.router_tx.send(RouterMessage::Boundary(event)).is_err() {
                    return ControlFlow::Stop;
                }
                ControlFlow::Continue
            }
            Err(TryRecvError::Empty) => ControlFlow::Continue,
            Err(TryRecvError::Disconnected) => ControlFlow::Continue,
        }
    }

    /// Flushes whatever is left in the ring (after classification has
    /// already extracted every real message it could) as a single
    /// `TERMINAL_OUTPUT` span — the genuine partial/unmatched remainder.
    fn flush_remainder(&mut self, scratch: &mut Vec<u8>) -> ControlFlow {
        let span = self.consumer.readable_span();
        if span.is_empty() {
            return ControlFlow::Continue;
        }
        let n = span.len();
        self.consumer.copy_into(n, scratch);
        if let Some(slot_id) = self.pool.allocate_blocking(POOL_WAIT) {
            let header = SlotHeader::new(
                p2dbg_core::MessageKind::TerminalOutput,
                scratch.len(),
                now_ns(),
                p2dbg_core::Confidence::Heuristic,
            );
            if self.pool.publish(slot_id, header, scratch).is_ok() {
                self.consumer.consume(n);
                self.metrics.inc_messages_out();
                if self.router_tx.send(RouterMessage::Slot(slot_id)).is_err() {
                    self.pool.release(slot_id);
                    return ControlFlow::Stop;
                }
            } else {
                self.pool.release(slot_id);
            }
        }
        ControlFlow::Continue
    }
}

/// The outcome of one `classify_and_publish_one` attempt.
enum Step {
    /// A message was classified, published, and forwarded (or dropped for a
    /// locally-recovered reason); the caller should try again immediately —
    /// there may be more already-buffered messages to classify.
    Matched,
    /// Not enough bytes were available to decide. `scanned_whole_span`
    /// is true when the scan already covered everything currently
    /// readable — only then is this a genuine "wait for more data"
    /// rather than an artifact of the line-budget scan cap.
    NeedMoreBytes { scanned_whole_span: bool },
    /// The router channel closed; the caller should stop.
    Stop,
}

#[derive(PartialEq, Eq)]
enum ControlFlow {
    Continue,
    Stop,
}
