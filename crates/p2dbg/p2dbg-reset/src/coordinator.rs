//! The reset coordinator: converts hardware resets (and golden-sync events
//! the router observes) into synchronization markers and a log-rotation
//! trigger. It never touches the ring, pool, or window registry directly —
//! only moves markers through channels and waits on acknowledgement.

use crate::stats::{ResetRecord, Stats};
use crate::state::ResetState;
use p2dbg_core::{Metrics, ResetEvent, RouterCommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What drives a pass through the state machine: a real hardware reset
/// (from `p2dbg-transport::pulse_reset`) or a golden-sync notification (the
/// router, on dispatching `P2_SYSTEM_INIT`).
pub enum CoordinatorEvent {
    HardwareReset(ResetEvent),
    GoldenSync,
}

pub struct ResetCoordinator {
    state: ResetState,
    stats: Arc<Mutex<Stats>>,
    drain_timeout: Duration,
}

impl ResetCoordinator {
    pub fn new(keep_last_k: usize, drain_timeout: Duration) -> Self {
        Self {
            state: ResetState::Idle,
            stats: Arc::new(Mutex::new(Stats::new(keep_last_k))),
            drain_timeout,
        }
    }

    /// A clone of the shared stats handle, safe to read from any thread
    /// while `run` drives the state machine on its own.
    pub fn stats_handle(&self) -> Arc<Mutex<Stats>> {
        self.stats.clone()
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Runs until `event_rx` disconnects or `cancel` is observed. Consumes
    /// `self` — the caller spawns this on its own thread.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        mut self,
        event_rx: Receiver<CoordinatorEvent>,
        boundary_tx: SyncSender<ResetEvent>,
        ack_rx: Receiver<u64>,
        router_cmd_tx: SyncSender<RouterCommand>,
        metrics: Arc<Metrics>,
        cancel: Arc<AtomicBool>,
    ) {
        loop {
            if cancel.load(Ordering::Acquire) {
                break;
            }
            match event_rx.recv_timeout(Duration::from_millis(200)) {
                Ok(CoordinatorEvent::HardwareReset(event)) => {
                    self.drive_reset(event, &boundary_tx, &ack_rx, &router_cmd_tx, &metrics);
                }
                Ok(CoordinatorEvent::GoldenSync) => {
                    self.drive_golden_sync(&router_cmd_tx);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("reset coordinator exiting");
    }

    fn drive_reset(
        &mut self,
        event: ResetEvent,
        boundary_tx: &SyncSender<ResetEvent>,
        ack_rx: &Receiver<u64>,
        router_cmd_tx: &SyncSender<RouterCommand>,
        metrics: &Metrics,
    ) {
        self.state = ResetState::ResetIssued;
        let messages_before = metrics.messages_out();
        info!(sequence = event.sequence, kind = ?event.kind, "reset issued, publishing boundary marker");
        if boundary_tx.send(event).is_err() {
            warn!("boundary channel closed, extractor is gone; reset coordinator idling");
            self.state = ResetState::Idle;
            return;
        }

        self.state = ResetState::QueuesDraining;
        let timed_out = !self.wait_for_ack(event.sequence, ack_rx);
        if timed_out {
            metrics.inc_drain_timeout();
            warn!(sequence = event.sequence, timeout_ms = self.drain_timeout.as_millis() as u64, "drain timeout, proceeding anyway");
        }

        self.state = ResetState::LogRotating;
        let messages_after = metrics.messages_out();
        if router_cmd_tx.send(RouterCommand::Rotate).is_err() {
            warn!("router command channel closed, rotate not delivered");
        }

        self.stats.lock().unwrap().record_reset(ResetRecord {
            event,
            messages_before,
            messages_after,
            timed_out,
        });
        self.state = ResetState::Idle;
    }

    fn drive_golden_sync(&mut self, router_cmd_tx: &SyncSender<RouterCommand>) {
        self.state = ResetState::LogRotating;
        if router_cmd_tx.send(RouterCommand::Rotate).is_err() {
            warn!("router command channel closed, golden sync rotate not delivered");
        }
        self.stats.lock().unwrap().record_golden_sync();
        self.state = ResetState::Idle;
    }

    /// Waits (up to `drain_timeout`) for the router to ack the boundary's
    /// exact sequence. Stale acks for an older boundary are ignored.
    fn wait_for_ack(&self, sequence: u64, ack_rx: &Receiver<u64>) -> bool {
        let deadline = Instant::now() + self.drain_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match ack_rx.recv_timeout(remaining) {
                Ok(acked) if acked == sequence => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    }
}
