use p2dbg_core::ResetEvent;
use std::collections::VecDeque;

/// One retained reset boundary plus the message-count bracket around it:
/// messages before and after the reset, sampled from `Metrics::messages_out()`
/// at `ResetIssued` and at `LogRotating`.
#[derive(Debug, Clone, Copy)]
pub struct ResetRecord {
    pub event: ResetEvent,
    pub messages_before: u64,
    pub messages_after: u64,
    pub timed_out: bool,
}

/// Statistics the reset coordinator maintains, including a retention ring of
/// the last `keep_last_k` boundaries (default 10) — a small closed record
/// plus a fixed-size retained-sample ring, applied to boundary markers
/// instead of latency samples.
pub struct Stats {
    pub total_resets: u64,
    pub reset_count_dtr: u64,
    pub reset_count_rts: u64,
    pub drain_timeout_count: u64,
    pub golden_sync_count: u64,
    retained: VecDeque<ResetRecord>,
    keep_last_k: usize,
}

impl Stats {
    pub fn new(keep_last_k: usize) -> Self {
        Self {
            total_resets: 0,
            reset_count_dtr: 0,
            reset_count_rts: 0,
            drain_timeout_count: 0,
            golden_sync_count: 0,
            retained: VecDeque::with_capacity(keep_last_k),
            keep_last_k,
        }
    }

    pub fn record_reset(&mut self, record: ResetRecord) {
        self.total_resets += 1;
        match record.event.kind {
            p2dbg_core::ControlLine::Dtr => self.reset_count_dtr += 1,
            p2dbg_core::ControlLine::Rts => self.reset_count_rts += 1,
        }
        if record.timed_out {
            self.drain_timeout_count += 1;
        }
        if self.retained.len() >= self.keep_last_k {
            self.retained.pop_front();
        }
        self.retained.push_back(record);
    }

    pub fn record_golden_sync(&mut self) {
        self.golden_sync_count += 1;
    }

    pub fn retained_boundaries(&self) -> impl Iterator<Item = &ResetRecord> {
        self.retained.iter()
    }
}
