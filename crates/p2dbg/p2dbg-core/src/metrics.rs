use crate::window_id::WindowId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Process-wide observable counters. Every counter is read with a relaxed
/// atomic load — cheap enough to poll from a metrics-scrape thread without
/// perturbing the hot path: reading should never cost the writer anything.
///
/// Ring fill/high-water and pool in-use/high-water are read directly off
/// `p2dbg-ring::ByteRing` / `p2dbg-pool::MessagePool`, which already track
/// them where the data lives; this struct holds everything else.
#[derive(Default)]
pub struct Metrics {
    bytes_in: AtomicU64,
    messages_out: AtomicU64,
    overflow_count: AtomicU64,
    drain_timeout_count: AtomicU64,
    queue_full_count: AtomicU64,
    handler_failed_count: AtomicU64,
    reset_count_dtr: AtomicU64,
    reset_count_rts: AtomicU64,
    window_queue_depths: Mutex<HashMap<WindowId, usize>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes_in(&self, n: u64) {
        self.bytes_in.fetch_add(n, Ordering::Relaxed);
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn inc_messages_out(&self) {
        self.messages_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_out(&self) -> u64 {
        self.messages_out.load(Ordering::Relaxed)
    }

    pub fn inc_overflow(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn inc_drain_timeout(&self) {
        self.drain_timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn drain_timeout_count(&self) -> u64 {
        self.drain_timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_queue_full(&self) {
        self.queue_full_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_full_count(&self) -> u64 {
        self.queue_full_count.load(Ordering::Relaxed)
    }

    pub fn inc_handler_failed(&self) {
        self.handler_failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_failed_count(&self) -> u64 {
        self.handler_failed_count.load(Ordering::Relaxed)
    }

    pub fn inc_reset(&self, kind: crate::reset::ControlLine) {
        match kind {
            crate::reset::ControlLine::Dtr => self.reset_count_dtr.fetch_add(1, Ordering::Relaxed),
            crate::reset::ControlLine::Rts => self.reset_count_rts.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn reset_counts(&self) -> (u64, u64) {
        (
            self.reset_count_dtr.load(Ordering::Relaxed),
            self.reset_count_rts.load(Ordering::Relaxed),
        )
    }

    /// Replaces the published per-window queue depth snapshot. Called by the
    /// router after each dispatch pass; never on the hot path of a single
    /// message.
    pub fn publish_window_depths(&self, depths: HashMap<WindowId, usize>) {
        *self.window_queue_depths.lock().unwrap() = depths;
    }

    pub fn window_queue_depth(&self, id: &WindowId) -> Option<usize> {
        self.window_queue_depths.lock().unwrap().get(id).copied()
    }
}
