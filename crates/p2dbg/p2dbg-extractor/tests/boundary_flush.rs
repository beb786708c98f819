//! Real extractor thread, real ring, real pool, real boundary channel — the
//! race a reset boundary actually has to survive: a complete message sitting
//! unconsumed in the ring when the boundary marker arrives on its own
//! channel must still come out with its true `MessageKind`, not get swept
//! up wholesale as raw `TERMINAL_OUTPUT`.

use p2dbg_core::{Confidence, ControlLine, MessageKind, Metrics, ResetEvent, RouterMessage};
use p2dbg_extractor::{Extractor, SentinelGate};
use p2dbg_pool::MessagePool;
use p2dbg_ring::{channel, RingConfig};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A complete `Cog3` line and the boundary marker both become available
/// before the extractor thread ever starts — the worst case for the bug
/// this guards against, since there is no chance the extractor drains the
/// line first just by being scheduled sooner.
#[test]
fn a_complete_line_pending_at_a_boundary_is_classified_not_flushed_raw() {
    let (producer, consumer) = channel(RingConfig::new(1 << 12));
    let pool = MessagePool::new(16).unwrap();
    let (router_tx, router_rx) = sync_channel(16);
    let (boundary_tx, boundary_rx) = sync_channel(4);
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    producer.append(b"Cog3  hello from cog 3\r\n").unwrap();
    boundary_tx
        .send(ResetEvent { kind: ControlLine::Dtr, timestamp_ns: 0, sequence: 1 })
        .unwrap();

    let extractor = Extractor::new(
        consumer,
        pool.clone(),
        router_tx,
        boundary_rx,
        metrics,
        Box::new(SentinelGate::default()),
        cancel.clone(),
    );
    let handle = thread::spawn(move || extractor.run());

    let first = router_rx.recv_timeout(RECV_TIMEOUT).expect("expected the classified cog message first");
    let slot_id = match first {
        RouterMessage::Slot(id) => id,
        RouterMessage::Boundary(_) => panic!("boundary arrived before the pending line was classified"),
    };
    assert_eq!(pool.kind_of(slot_id), MessageKind::CogMessage(p2dbg_core::CogIndex::new(3).unwrap()));
    assert_eq!(pool.header_of(slot_id).confidence, Confidence::Matched);
    assert_eq!(pool.read(slot_id), b"Cog3  hello from cog 3\r\n");
    pool.release(slot_id);

    let second = router_rx.recv_timeout(RECV_TIMEOUT).expect("expected the boundary marker second");
    match second {
        RouterMessage::Boundary(event) => assert_eq!(event.sequence, 1),
        RouterMessage::Slot(_) => panic!("unexpected extra slot before the boundary"),
    }

    cancel.store(true, std::sync::atomic::Ordering::Release);
    producer.close();
    handle.join().unwrap();
}

/// A genuine partial line (no terminator yet) at boundary time still has to
/// flush as `TERMINAL_OUTPUT` — the fix must not stop that path from
/// working, only stop it from swallowing complete messages too.
#[test]
fn a_genuine_partial_line_at_a_boundary_still_flushes_as_terminal_output() {
    let (producer, consumer) = channel(RingConfig::new(1 << 12));
    let pool = MessagePool::new(16).unwrap();
    let (router_tx, router_rx) = sync_channel(16);
    let (boundary_tx, boundary_rx) = sync_channel(4);
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    producer.append(b"no terminator yet").unwrap();
    boundary_tx
        .send(ResetEvent { kind: ControlLine::Rts, timestamp_ns: 0, sequence: 9 })
        .unwrap();

    let extractor = Extractor::new(
        consumer,
        pool.clone(),
        router_tx,
        boundary_rx,
        metrics,
        Box::new(SentinelGate::default()),
        cancel.clone(),
    );
    let handle = thread::spawn(move || extractor.run());

    let first = router_rx.recv_timeout(RECV_TIMEOUT).unwrap();
    let slot_id = match first {
        RouterMessage::Slot(id) => id,
        RouterMessage::Boundary(_) => panic!("expected the flushed remainder before the boundary"),
    };
    assert_eq!(pool.kind_of(slot_id), MessageKind::TerminalOutput);
    assert_eq!(pool.read(slot_id), b"no terminator yet");
    pool.release(slot_id);

    let second = router_rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert!(matches!(second, RouterMessage::Boundary(e) if e.sequence == 9));

    cancel.store(true, std::sync::atomic::Ordering::Release);
    producer.close();
    handle.join().unwrap();
}
