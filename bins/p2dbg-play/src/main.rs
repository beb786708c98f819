mod handlers;

use handlers::{CentralLogHandler, TerminalHandler};
use p2dbg_core::{now_ns, Metrics, RouterCommand, RouterMessage, WindowId};
use p2dbg_extractor::{Extractor, SentinelGate};
use p2dbg_pool::MessagePool;
use p2dbg_record::{spawn_player, PlayerCommand};
use p2dbg_reset::{CoordinatorEvent, ResetCoordinator};
use p2dbg_ring::RingConfig;
use p2dbg_router::Router;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let mut args = std::env::args().skip(1);
    let recording_path = args.next().ok_or("usage: p2dbg-play <recording.p2rec> [speed]")?;
    let speed: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);

    let (ring_producer, ring_consumer) = p2dbg_ring::channel(RingConfig::new(p2dbg_config::defaults::ring_capacity_bytes()));
    let pool = MessagePool::new(p2dbg_config::defaults::pool_slots())?;
    let metrics = Arc::new(Metrics::new());
    let cancel = Arc::new(AtomicBool::new(false));

    let (router_tx, router_rx) = sync_channel::<RouterMessage>(1024);
    let (_boundary_tx, boundary_rx) = sync_channel(4);
    let (command_tx, command_rx) = sync_channel::<RouterCommand>(64);
    let (ack_tx, ack_rx) = sync_channel(4);
    let (golden_tx, golden_rx) = sync_channel(4);
    let (coordinator_event_tx, coordinator_event_rx) = sync_channel(16);

    std::thread::spawn(move || {
        while golden_rx.recv().is_ok() {
            if coordinator_event_tx.send(CoordinatorEvent::GoldenSync).is_err() {
                break;
            }
        }
    });

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
        p2dbg_config::defaults::pre_ready_queue_cap(),
        None,
        metrics.clone(),
        ack_tx,
        golden_tx,
        cancel.clone(),
    );
    let router_handle = std::thread::spawn(move || router.run());

    let coordinator = ResetCoordinator::new(10, std::time::Duration::from_millis(p2dbg_config::defaults::drain_timeout_ms()));
    let (dummy_boundary_tx, _keep_boundary_rx_alive) = sync_channel(1);
    let coordinator_metrics = metrics.clone();
    let coordinator_cancel = cancel.clone();
    let coordinator_handle = std::thread::spawn(move || {
        coordinator.run(coordinator_event_rx, dummy_boundary_tx, ack_rx, command_tx, coordinator_metrics, coordinator_cancel)
    });

    let (player_cmd_tx, player_handle) = match spawn_player(&recording_path, ring_producer, now_ns) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, path = %recording_path, "failed to load recording");
            return Err(e.into());
        }
    };

    player_cmd_tx.send(PlayerCommand::SetSpeed(speed))?;
    player_cmd_tx.send(PlayerCommand::Play)?;
    info!(path = %recording_path, speed, "playback started");

    player_handle.join().ok();
    cancel.store(true, std::sync::atomic::Ordering::Release);

    extractor_handle.join().ok();
    router_handle.join().ok();
    coordinator_handle.join().ok();

    Ok(())
}
