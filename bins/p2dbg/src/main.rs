mod handlers;
mod signals;

use handlers::{CentralLogHandler, TerminalHandler};
use p2dbg_config::EngineConfig;
use p2dbg_core::{now_ns, Metrics, RouterCommand, RouterMessage, WindowId};
use p2dbg_extractor::{Extractor, SentinelGate};
use p2dbg_pool::MessagePool;
use p2dbg_record::{Metadata, Recorder};
use p2dbg_reset::{CoordinatorEvent, ResetCoordinator};
use p2dbg_ring::RingConfig;
use p2dbg_router::Router;
use p2dbg_transport::SerialTransport;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The P2 auto-baud ROM ack pattern is device-specific and not confirmed by
/// any retrievable original source (see DESIGN.md); an empty pattern simply
/// disables auto-baud observation without affecting the read path.
const AUTOBAUD_PATTERN: &[u8] = &[];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "p2dbg.toml".to_string());
    let config = EngineConfig::load(config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let record_path = std::env::args().nth(2);

    let (ring_producer, ring_consumer) = p2dbg_ring::channel(RingConfig::new(config.ring_capacity_bytes));
    let pool = MessagePool::new(config.pool_slots)?;
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    let (router_tx, router_rx) = sync_channel::<RouterMessage>(1024);
    let (boundary_tx, boundary_rx) = sync_channel(4);
    let (command_tx, command_rx) = sync_channel::<RouterCommand>(64);
    let (ack_tx, ack_rx) = sync_channel(4);
    let (golden_tx, golden_rx) = sync_channel(4);
    let (reset_event_tx, reset_event_rx) = sync_channel(4);
    let (coordinator_event_tx, coordinator_event_rx) = sync_channel(16);

    // Relay threads: fold the transport's raw reset pulses and the router's
    // golden-sync notifications into the coordinator's single event stream.
    {
        let coordinator_event_tx = coordinator_event_tx.clone();
        std::thread::spawn(move || {
            while let Ok(event) = reset_event_rx.recv() {
                if coordinator_event_tx.send(CoordinatorEvent::HardwareReset(event)).is_err() {
                    break;
                }
            }
        });
    }
    {
        let coordinator_event_tx = coordinator_event_tx.clone();
        std::thread::spawn(move || {
            while golden_rx.recv().is_ok() {
                if coordinator_event_tx.send(CoordinatorEvent::GoldenSync).is_err() {
                    break;
                }
            }
        });
    }

    let mut transport = SerialTransport::open(&config.port, config.baud, config.control_line)?;
    if config.reset_on_connect {
        transport.pulse_reset(&reset_event_tx, now_ns)?;
    }
    let control_handle = transport.try_clone_control()?;

    let recorder = match record_path {
        Some(path) => {
            let metadata = Metadata {
                device_name: config.port.clone(),
                recording_date: String::new(),
                total_duration_ms: 0,
                entry_count: 0,
            };
            Some(Recorder::start(path, now_ns(), metadata, 4096)?)
        }
        None => None,
    };
    let recorder_tap = recorder.as_ref().map(Recorder::tap);

    let reader_handle = transport.spawn_reader(
        ring_producer,
        metrics.clone(),
        AUTOBAUD_PATTERN.to_vec(),
        cancel.clone(),
        recorder_tap,
    );

    let extractor = Extractor::new(
        ring_consumer,
        pool.clone(),
        router_tx,
        boundary_rx,
        metrics.clone(),
        Box::new(SentinelGate::default()),
        cancel.clone(),
    );
    let extractor_handle = std::thread::spawn(move || extractor.run());

    command_tx.send(RouterCommand::RegisterHandler(WindowId::central_log(), Box::new(CentralLogHandler)))?;
    command_tx.send(RouterCommand::RegisterHandler(WindowId::main_terminal(), Box::new(TerminalHandler)))?;

    let router = Router::new(
        router_rx,
        command_rx,
        pool,
        config.pre_ready_queue_cap,
        None,
        metrics.clone(),
        ack_tx,
        golden_tx,
        cancel.clone(),
    );
    let router_handle = std::thread::spawn(move || router.run());

    let coordinator = ResetCoordinator::new(10, std::time::Duration::from_millis(config.drain_timeout_ms));
    let coordinator_metrics = metrics.clone();
    let coordinator_cancel = cancel.clone();
    let coordinator_handle = std::thread::spawn(move || {
        coordinator.run(coordinator_event_rx, boundary_tx, ack_rx, command_tx, coordinator_metrics, coordinator_cancel)
    });

    let signals_handle = signals::spawn(control_handle, reset_event_tx, cancel.clone())?;

    info!(port = %config.port, "p2dbg engine running");

    extractor_handle.join().ok();
    router_handle.join().ok();
    coordinator_handle.join().ok();
    // Explicit close: cancels the read loop (if some other shutdown path
    // hasn't already) and blocks until the thread has actually exited and
    // the device is released, rather than just joining a thread that may
    // still be mid-read.
    reader_handle.close().ok();
    signals_handle.join().ok();

    if let Some(recorder) = recorder {
        recorder.stop();
    }

    Ok(())
}
