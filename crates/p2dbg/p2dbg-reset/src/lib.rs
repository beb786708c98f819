//! `p2dbg-reset`: the reset coordinator (component C6). Converts hardware
//! resets and golden-sync notifications into ordered boundary markers and a
//! log-rotation trigger, without ever touching the ring, pool, or window
//! registry itself.

mod coordinator;
mod error;
mod state;
mod stats;

pub use coordinator::{CoordinatorEvent, ResetCoordinator};
pub use error::ResetError;
pub use state::ResetState;
pub use stats::{ResetRecord, Stats};

#[cfg(test)]
mod tests {
    use super::*;
    use p2dbg_core::{ControlLine, Metrics, ResetEvent, RouterCommand};
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc::sync_channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn a_clean_reset_drives_through_all_states_and_records_a_boundary() {
        let coordinator = ResetCoordinator::new(10, Duration::from_millis(200));
        let stats = coordinator.stats_handle();

        let (event_tx, event_rx) = sync_channel(4);
        let (boundary_tx, boundary_rx) = sync_channel(4);
        let (ack_tx, ack_rx) = sync_channel(4);
        let (cmd_tx, cmd_rx) = sync_channel(4);
        let metrics = Arc::new(Metrics::new());
        let cancel = Arc::new(AtomicBool::new(false));

        let event = ResetEvent { kind: ControlLine::Dtr, timestamp_ns: 1, sequence: 7 };
        event_tx.send(CoordinatorEvent::HardwareReset(event)).unwrap();

        // Stand in for the extractor: observe the boundary, then ack it as
        // the router would.
        let acker = thread::spawn(move || {
            let forwarded = boundary_rx.recv().unwrap();
            assert_eq!(forwarded.sequence, 7);
            ack_tx.send(7).unwrap();
        });

        let cancel_for_run = cancel.clone();
        let handle = thread::spawn(move || {
            coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics, cancel_for_run);
        });

        acker.join().unwrap();
        assert!(matches!(cmd_rx.recv_timeout(Duration::from_secs(1)).unwrap(), RouterCommand::Rotate));

        cancel.store(true, std::sync::atomic::Ordering::Release);
        drop(event_tx);
        handle.join().unwrap();

        let guard = stats.lock().unwrap();
        assert_eq!(guard.total_resets, 1);
        assert_eq!(guard.reset_count_dtr, 1);
        assert_eq!(guard.drain_timeout_count, 0);
        assert_eq!(guard.retained_boundaries().count(), 1);
    }

    #[test]
    fn a_missing_ack_times_out_and_still_rotates() {
        let coordinator = ResetCoordinator::new(10, Duration::from_millis(30));
        let stats = coordinator.stats_handle();

        let (event_tx, event_rx) = sync_channel(4);
        let (boundary_tx, _boundary_rx) = sync_channel(4);
        let (_ack_tx, ack_rx) = sync_channel(4);
        let (cmd_tx, cmd_rx) = sync_channel(4);
        let metrics = Arc::new(Metrics::new());
        let cancel = Arc::new(AtomicBool::new(false));

        let event = ResetEvent { kind: ControlLine::Rts, timestamp_ns: 2, sequence: 1 };
        event_tx.send(CoordinatorEvent::HardwareReset(event)).unwrap();

        let cancel_for_run = cancel.clone();
        let metrics_for_run = metrics.clone();
        let handle = thread::spawn(move || {
            coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics_for_run, cancel_for_run);
        });

        assert!(matches!(cmd_rx.recv_timeout(Duration::from_secs(1)).unwrap(), RouterCommand::Rotate));
        cancel.store(true, std::sync::atomic::Ordering::Release);
        drop(event_tx);
        handle.join().unwrap();

        assert_eq!(metrics.drain_timeout_count(), 1);
        let guard = stats.lock().unwrap();
        assert_eq!(guard.drain_timeout_count, 1);
        assert!(guard.retained_boundaries().next().unwrap().timed_out);
    }

    #[test]
    fn golden_sync_rotates_without_a_boundary_marker() {
        let coordinator = ResetCoordinator::new(10, Duration::from_millis(200));
        let stats = coordinator.stats_handle();

        let (event_tx, event_rx) = sync_channel(4);
        let (boundary_tx, _boundary_rx) = sync_channel(4);
        let (_ack_tx, ack_rx) = sync_channel(4);
        let (cmd_tx, cmd_rx) = sync_channel(4);
        let metrics = Arc::new(Metrics::new());
        let cancel = Arc::new(AtomicBool::new(false));

        event_tx.send(CoordinatorEvent::GoldenSync).unwrap();

        let cancel_for_run = cancel.clone();
        let handle = thread::spawn(move || {
            coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics, cancel_for_run);
        });

        assert!(matches!(cmd_rx.recv_timeout(Duration::from_secs(1)).unwrap(), RouterCommand::Rotate));
        cancel.store(true, std::sync::atomic::Ordering::Release);
        drop(event_tx);
        handle.join().unwrap();

        let guard = stats.lock().unwrap();
        assert_eq!(guard.golden_sync_count, 1);
        assert_eq!(guard.total_resets, 0);
    }

    #[test]
    fn retention_ring_caps_at_keep_last_k() {
        let coordinator = ResetCoordinator::new(2, Duration::from_millis(200));
        let stats = coordinator.stats_handle();

        let (event_tx, event_rx) = sync_channel(8);
        let (boundary_tx, boundary_rx) = sync_channel(8);
        let (ack_tx, ack_rx) = sync_channel(8);
        let (cmd_tx, _cmd_rx) = sync_channel(8);
        let metrics = Arc::new(Metrics::new());
        let cancel = Arc::new(AtomicBool::new(false));

        for sequence in 1..=3u64 {
            let event = ResetEvent { kind: ControlLine::Dtr, timestamp_ns: sequence, sequence };
            event_tx.send(CoordinatorEvent::HardwareReset(event)).unwrap();
        }

        let ack_tx_for_acker = ack_tx.clone();
        let acker = thread::spawn(move || {
            for _ in 0..3 {
                let forwarded = boundary_rx.recv().unwrap();
                ack_tx_for_acker.send(forwarded.sequence).unwrap();
            }
        });

        let cancel_for_run = cancel.clone();
        let handle = thread::spawn(move || {
            coordinator.run(event_rx, boundary_tx, ack_rx, cmd_tx, metrics, cancel_for_run);
        });

        acker.join().unwrap();
        thread::sleep(Duration::from_millis(50));
        cancel.store(true, std::sync::atomic::Ordering::Release);
        drop(event_tx);
        handle.join().unwrap();

        let guard = stats.lock().unwrap();
        assert_eq!(guard.total_resets, 3);
        assert_eq!(guard.retained_boundaries().count(), 2);
        let sequences: Vec<u64> = guard.retained_boundaries().map(|r| r.event.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
    }
}
