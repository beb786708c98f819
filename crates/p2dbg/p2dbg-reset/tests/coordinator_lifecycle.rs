//! Drives the reset coordinator (component C6) across real threads playing
//! the extractor and router's actual roles — boundary marker out one
//! channel, ack back on another, rotate command out a third — rather than
//! calling the state machine's internals directly from one thread.

use p2dbg_core::{ControlLine, Metrics, ResetEvent, RouterCommand};
use p2dbg_reset::{CoordinatorEvent, ResetCoordinator, ResetState};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A hardware reset drives `Idle -> ResetIssued -> QueuesDraining ->
/// LogRotating -> Idle`: the boundary reaches the stand-in router thread,
/// which acks it like the real router does after processing the marker,
/// and exactly one `Rotate` command follows.
#[test]
fn a_hardware_reset_rotates_only_after_the_router_acks_the_boundary() {
    let coordinator = ResetCoordinator::new(10, Duration::from_millis(300));
    assert_eq!(coordinator.state(), ResetState::Idle);

    let (event_tx, event_rx) = sync_channel(4);
    let (boundary_tx, boundary_rx) = sync_channel(4);
    let (ack_tx, ack_rx) = sync_channel(4);
    let (cmd_tx, cmd_rx) = sync_channel(4);
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    let router_stub = thread::spawn(move || {
        let boundary = boundary_rx.recv_timeout(RECV_TIMEOUT).unwrap();
        // Simulate real router work happening between boundary receipt and
        // ack, so the ack is not a trivial same-instant echo.
        thread::sleep(Duration::from_millis(20));
        ack_tx.send(boundary.sequence).unwrap();
    });

    let cancel_for_run = cancel.clone();
    let run_handle = thread::spawn(move || {
        coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics, cancel_for_run);
    });

    event_tx
        .send(CoordinatorEvent::HardwareReset(ResetEvent { kind: ControlLine::Dtr, timestamp_ns: 5, sequence: 3 }))
        .unwrap();

    router_stub.join().unwrap();
    assert!(matches!(cmd_rx.recv_timeout(RECV_TIMEOUT).unwrap(), RouterCommand::Rotate));
    assert!(cmd_rx.try_recv().is_err(), "only one Rotate must follow a single reset");

    cancel.store(true, std::sync::atomic::Ordering::Release);
    drop(event_tx);
    run_handle.join().unwrap();
}

/// When the router never acks (wedged or gone), the coordinator still
/// rotates once its drain timeout elapses, and records the boundary as
/// timed out rather than hanging forever.
#[test]
fn a_wedged_router_does_not_prevent_rotation_after_the_drain_timeout() {
    let coordinator = ResetCoordinator::new(10, Duration::from_millis(40));
    let stats = coordinator.stats_handle();

    let (event_tx, event_rx) = sync_channel(4);
    let (boundary_tx, _boundary_rx) = sync_channel(4);
    let (_ack_tx, ack_rx) = sync_channel(4);
    let (cmd_tx, cmd_rx) = sync_channel(4);
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    event_tx
        .send(CoordinatorEvent::HardwareReset(ResetEvent { kind: ControlLine::Rts, timestamp_ns: 1, sequence: 11 }))
        .unwrap();

    let cancel_for_run = cancel.clone();
    let metrics_for_run = metrics.clone();
    let run_handle = thread::spawn(move || {
        coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics_for_run, cancel_for_run);
    });

    assert!(matches!(cmd_rx.recv_timeout(RECV_TIMEOUT).unwrap(), RouterCommand::Rotate));
    assert_eq!(metrics.drain_timeout_count(), 1);

    cancel.store(true, std::sync::atomic::Ordering::Release);
    drop(event_tx);
    run_handle.join().unwrap();

    let guard = stats.lock().unwrap();
    assert_eq!(guard.total_resets, 1);
    assert!(guard.retained_boundaries().next().unwrap().timed_out);
}
