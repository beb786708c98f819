//! The SPSC byte ring itself (component C2).
//!
//! Only the producer (`p2dbg-transport`'s read thread) writes; only the
//! consumer (the extractor thread) reads. Writes publish with a *release*
//! store to `head`; reads use an *acquire* load of `head`, and the reverse
//! for `tail` — these orderings are the sole cross-thread synchronization,
//! applied here to a raw byte stream instead of a slab of typed,
//! seqlock-protected slots (there is exactly one producer and one consumer
//! of one shared region, so no seqlock is needed — see DESIGN.md).

use crate::config::RingConfig;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Raised when an `append` would exceed the ring's free space. The bytes in
/// that call are dropped wholesale, but never silently: every dropped byte
/// is still accounted for in `dropped`.
#[derive(Debug, Clone, Copy, Error)]
#[error("ring overflow: {dropped} byte(s) dropped")]
pub struct Overflow {
    pub dropped: usize,
}

struct Inner {
    buf: UnsafeCell<Box<[u8]>>,
    mask: u64,
    capacity: u64,
    /// Monotonically increasing count of bytes ever appended.
    head: AtomicU64,
    /// Monotonically increasing count of bytes ever consumed.
    tail: AtomicU64,
    high_water: AtomicU64,
    overflow_count: AtomicU64,
    closed: AtomicBool,
    wake_mutex: Mutex<()>,
    wake_cv: Condvar,
}

// SAFETY: `buf` is only ever written by the single producer (within the free
// region the atomic head/tail accounting guarantees is not concurrently
// readable) and only ever read by the single consumer (within the region a
// prior `readable_span` reported, which the producer never overwrites before
// `consume` advances `tail` past it).
unsafe impl Sync for Inner {}
unsafe impl Send for Inner {}

impl Inner {
    fn new(cfg: RingConfig) -> Self {
        Self {
            buf: UnsafeCell::new(vec![0u8; cfg.capacity].into_boxed_slice()),
            mask: cfg.mask(),
            capacity: cfg.capacity as u64,
            head: AtomicU64::new(0),
            tail: AtomicU64::new(0),
            high_water: AtomicU64::new(0),
            overflow_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            wake_mutex: Mutex::new(()),
            wake_cv: Condvar::new(),
        }
    }

    fn notify(&self) {
        let _guard = self.wake_mutex.lock().unwrap();
        self.wake_cv.notify_one();
    }
}

/// The single producer handle. Not `Clone` — there is exactly one writer.
pub struct RingProducer {
    inner: Arc<Inner>,
}

/// The single consumer handle. Not `Clone` — there is exactly one reader.
pub struct RingConsumer {
    inner: Arc<Inner>,
}

/// Creates a fresh ring and returns its producer/consumer halves.
pub fn channel(cfg: RingConfig) -> (RingProducer, RingConsumer) {
    let inner = Arc::new(Inner::new(cfg));
    (
        RingProducer { inner: inner.clone() },
        RingConsumer { inner },
    )
}

impl RingProducer {
    /// Appends `bytes` to the ring, or fails wholesale with `Overflow` if
    /// there isn't room. On success, wakes a consumer blocked in
    /// `wait_for_data`.
    pub fn append(&self, bytes: &[u8]) -> Result<(), Overflow> {
        if bytes.is_empty() {
            return Ok(());
        }
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Acquire);
        let in_use = head - tail;
        let free = self.inner.capacity - in_use;

        if bytes.len() as u64 > free {
            self.inner
                .overflow_count
                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
            return Err(Overflow { dropped: bytes.len() });
        }

        // SAFETY: the consumer only ever reads the region [tail, head); the
        // free-space check above guarantees this write (into [head, head+len))
        // does not touch that region, even across the wrap.
        unsafe {
            let buf = &mut *self.inner.buf.get();
            let cap = self.inner.capacity as usize;
            let start = (head & self.inner.mask) as usize;
            let first_len = bytes.len().min(cap - start);
            buf[start..start + first_len].copy_from_slice(&bytes[..first_len]);
            if first_len < bytes.len() {
                let rest = &bytes[first_len..];
                buf[..rest.len()].copy_from_slice(rest);
            }
        }

        let new_head = head + bytes.len() as u64;
        self.inner.head.store(new_head, Ordering::Release);

        let new_in_use = new_head - tail;
        self.inner.high_water.fetch_max(new_in_use, Ordering::Relaxed);

        self.inner.notify();
        Ok(())
    }

    pub fn overflow_count(&self) -> u64 {
        self.inner.overflow_count.load(Ordering::Relaxed)
    }

    /// Marks the producer side closed (transport `close()`); the consumer
    /// observes end-of-stream once it has drained everything already
    /// published.
    pub fn close(self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify();
    }
}

/// A readable view into the ring, possibly split across the wrap point.
#[derive(Debug, Clone, Copy)]
pub struct ReadableSpan<'a> {
    pub first: &'a [u8],
    pub second: &'a [u8],
}

impl ReadableSpan<'_> {
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RingConsumer {
    /// Returns the contiguous readable region(s): bytes the producer has
    /// published (`head`) but this consumer has not yet `consume`d (`tail`).
    /// May be empty, one slice, or split across the wrap boundary.
    pub fn readable_span(&self) -> ReadableSpan<'_> {
        let head = self.inner.head.load(Ordering::Acquire);
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let avail = (head - tail) as usize;
        if avail == 0 {
            return ReadableSpan { first: &[], second: &[] };
        }

        let cap = self.inner.capacity as usize;
        let start = (tail & self.inner.mask) as usize;
        let first_len = avail.min(cap - start);
        let second_len = avail - first_len;

        // SAFETY: [tail, head) is exactly the region the producer guarantees
        // not to overwrite until `consume` advances `tail` past it.
        let buf = unsafe { &*self.inner.buf.get() };
        ReadableSpan {
            first: &buf[start..start + first_len],
            second: &buf[..second_len],
        }
    }

    /// Advances `tail` by `n`. Callers must never pass an `n` greater than
    /// what the most recent `readable_span` reported — exceeding it would
    /// violate the ring's `0 <= head - tail <= capacity` invariant.
    pub fn consume(&self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(
            n as u64 <= self.readable_span().len() as u64,
            "consume({n}) exceeds the last reported readable span"
        );
        self.inner.tail.fetch_add(n as u64, Ordering::Release);
    }

    /// Copies the first `n` bytes of the current readable span into `out`,
    /// concatenating across the wrap in one pass — the "bounce buffer" used
    /// when a matched span straddles the wrap and must be handed to the pool
    /// as one contiguous slice.
    pub fn copy_into(&self, n: usize, out: &mut Vec<u8>) {
        let span = self.readable_span();
        debug_assert!(n <= span.len());
        out.clear();
        out.reserve(n);
        if n <= span.first.len() {
            out.extend_from_slice(&span.first[..n]);
        } else {
            out.extend_from_slice(span.first);
            out.extend_from_slice(&span.second[..n - span.first.len()]);
        }
    }

    /// Blocks until data is available, the producer closes, or `timeout`
    /// elapses. Returns `true` if data (or closure) is observed, `false` on
    /// a bare timeout with nothing to show for it.
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        if !self.readable_span().is_empty() || self.is_closed() {
            return true;
        }
        let guard = self.inner.wake_mutex.lock().unwrap();
        if !self.readable_span().is_empty() || self.is_closed() {
            return true;
        }
        let (_guard, timeout_result) = self.inner.wake_cv.wait_timeout(guard, timeout).unwrap();
        !timeout_result.timed_out() || !self.readable_span().is_empty() || self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u64 {
        self.inner.capacity
    }

    /// Current ring occupancy in bytes — the numerator of the "ring fill %"
    /// metric.
    pub fn fill_bytes(&self) -> u64 {
        let head = self.inner.head.load(Ordering::Acquire);
        let tail = self.inner.tail.load(Ordering::Relaxed);
        head - tail
    }

    pub fn high_water(&self) -> u64 {
        self.inner.high_water.load(Ordering::Relaxed)
    }

    pub fn overflow_count(&self) -> u64 {
        self.inner.overflow_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn append_then_read_roundtrip() {
        let (p, c) = channel(RingConfig::new(16));
        p.append(b"hello").unwrap();
        let span = c.readable_span();
        assert_eq!(span.len(), 5);
        let mut out = Vec::new();
        c.copy_into(5, &mut out);
        assert_eq!(out, b"hello");
        c.consume(5);
        assert_eq!(c.readable_span().len(), 0);
    }

    #[test]
    fn wrap_around_splits_the_span() {
        let (p, c) = channel(RingConfig::new(8));
        p.append(b"123456").unwrap();
        c.consume(6);
        p.append(b"abcdef").unwrap();
        let span = c.readable_span();
        assert_eq!(span.len(), 6);
        let mut out = Vec::new();
        c.copy_into(6, &mut out);
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn ring_fills_exactly_then_overflows() {
        let (p, c) = channel(RingConfig::new(8));
        p.append(b"12345678").unwrap();
        assert_eq!(c.fill_bytes(), 8);
        let err = p.append(b"x").unwrap_err();
        assert_eq!(err.dropped, 1);
        assert_eq!(p.overflow_count(), 1);

        c.consume(4);
        p.append(b"ab").unwrap();
        assert_eq!(c.fill_bytes(), 6);
    }

    #[test]
    fn overflow_recovery_drains_everything_after_unpausing() {
        let cap = 1024usize;
        let (p, c) = channel(RingConfig::new(cap));
        let burst = vec![7u8; cap + cap / 2];

        let mut dropped_total = 0usize;
        for chunk in burst.chunks(256) {
            if let Err(e) = p.append(chunk) {
                dropped_total += e.dropped;
            }
        }
        assert!(p.overflow_count() >= 1);
        assert!(dropped_total > 0);

        let mut consumed_total = 0usize;
        loop {
            let span = c.readable_span();
            if span.is_empty() {
                break;
            }
            let n = span.len();
            c.consume(n);
            consumed_total += n;
        }
        assert_eq!(consumed_total as u64, cap as u64);
        assert_eq!(c.fill_bytes(), 0);
    }

    #[test]
    fn producer_wakes_a_blocked_consumer() {
        let (p, c) = channel(RingConfig::new(64));
        let handle = thread::spawn(move || c.wait_for_data(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        p.append(b"woken").unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn close_wakes_a_blocked_consumer() {
        let (p, c) = channel(RingConfig::new(64));
        let handle = thread::spawn(move || c.wait_for_data(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        p.close();
        assert!(handle.join().unwrap());
    }
}
