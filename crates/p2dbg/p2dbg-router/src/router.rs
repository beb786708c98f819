//! The two-tier router (component C5): a single thread that dequeues
//! `RouterMessage`s from the extractor's boundary channel, looks up
//! destinations by `MessageKind` (kind router tier), and resolves those
//! destination identities through the window registry (window router
//! tier), enforcing the pre-ready queue and in-order delivery per window.
//!
//! One thread owns a reader plus a per-key state/destination map, and loops
//! pulling events and dispatching them.

use crate::registry::{DeliverOutcome, WindowRegistry};
use crate::routing_table::RoutingTable;
use p2dbg_core::{MessageKind, Metrics, RouterCommand, RouterMessage, WindowCreator, WindowId};
use p2dbg_pool::MessagePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Router {
    extractor_rx: Receiver<RouterMessage>,
    command_rx: Receiver<RouterCommand>,
    pool: MessagePool,
    registry: WindowRegistry,
    routing_table: RoutingTable,
    window_creator: Option<Box<dyn WindowCreator>>,
    metrics: Arc<Metrics>,
    boundary_ack_tx: SyncSender<u64>,
    golden_sync_tx: SyncSender<()>,
    cancel: Arc<AtomicBool>,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor_rx: Receiver<RouterMessage>,
        command_rx: Receiver<RouterCommand>,
        pool: MessagePool,
        pre_ready_queue_cap: usize,
        window_creator: Option<Box<dyn WindowCreator>>,
        metrics: Arc<Metrics>,
        boundary_ack_tx: SyncSender<u64>,
        golden_sync_tx: SyncSender<()>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            extractor_rx,
            command_rx,
            pool,
            registry: WindowRegistry::new(pre_ready_queue_cap),
            routing_table: RoutingTable::new(),
            window_creator,
            metrics,
            boundary_ack_tx,
            golden_sync_tx,
            cancel,
        }
    }

    pub fn routing_table_mut(&mut self) -> &mut RoutingTable {
        &mut self.routing_table
    }

    /// Runs until the extractor channel disconnects (stream closed and
    /// drained) or `cancel` is observed between messages. Consumes `self` —
    /// callers spawn this on its own thread.
    pub fn run(mut self) {
        loop {
            if self.cancel.load(Ordering::Acquire) {
                break;
            }
            self.drain_commands();

            match self.extractor_rx.recv_timeout(POLL_TIMEOUT) {
                Ok(RouterMessage::Slot(slot_id)) => {
                    let header = self.pool.header_of(slot_id);
                    let payload = self.pool.read(slot_id).to_vec();
                    self.dispatch_kind(&header.kind, &payload, header.arrival_timestamp_ns);
                    self.pool.release(slot_id);
                    self.publish_depths();
                }
                Ok(RouterMessage::Boundary(event)) => {
                    info!(sequence = event.sequence, "router observed reset boundary");
                    let _ = self.boundary_ack_tx.send(event.sequence);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("router exiting");
    }

    fn drain_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(RouterCommand::RegisterInstance(id)) => self.registry.register_instance(id),
                Ok(RouterCommand::RegisterHandler(id, handler)) => self.registry.register_handler(id, handler),
                Ok(RouterCommand::Unregister(id)) => self.registry.unregister(&id),
                Ok(RouterCommand::Rotate) => self.registry.rotate_all(),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Computes destinations for `kind` and delivers to each.
    fn dispatch_kind(&mut self, kind: &MessageKind, payload: &[u8], arrival_ns: u64) {
        match kind {
            MessageKind::DebuggerPacket(n) => {
                self.deliver_to(&[WindowId::central_log(), WindowId::debugger(n.get())], kind, payload, arrival_ns);
            }
            MessageKind::CogMessage(n) => {
                self.deliver_to(&[WindowId::central_log(), WindowId::cog(n.get())], kind, payload, arrival_ns);
            }
            MessageKind::InvalidCog => {
                self.deliver_to(&[WindowId::central_log()], kind, payload, arrival_ns);
            }
            MessageKind::P2SystemInit => {
                self.deliver_to(&[WindowId::central_log(), WindowId::cog(0)], kind, payload, arrival_ns);
                // Rotation is triggered solely by the coordinator's own
                // `RouterCommand::Rotate`, once it observes this GoldenSync
                // notification — the router never rotates pre-emptively,
                // or messages delivered between this point and the
                // coordinator's rotation would be wiped by it.
                if self.golden_sync_tx.try_send(()).is_err() {
                    warn!("golden sync notification dropped, reset coordinator channel busy");
                }
            }
            MessageKind::BacktickCreate { window_type, name } => {
                if let Some(creator) = self.window_creator.as_mut() {
                    creator.create_window(*window_type, name);
                } else {
                    warn!(window_type = ?window_type, name = %name, "no window creator registered, backtick CREATE dropped");
                }
            }
            MessageKind::BacktickUpdate { names } => {
                let targets: Vec<WindowId> = match p2dbg_extractor::reparse_update(payload) {
                    Some((reparsed_names, update_payload)) => {
                        debug_assert_eq!(&reparsed_names, names, "router reparse disagrees with extractor's classification");
                        self.deliver_payload_to(names, kind, &update_payload, arrival_ns);
                        return;
                    }
                    None => {
                        warn!("failed to reparse BACKTICK_UPDATE payload, delivering raw line");
                        names.to_vec()
                    }
                };
                self.deliver_payload_to(&targets, kind, payload, arrival_ns);
            }
            MessageKind::TerminalOutput | MessageKind::UnclassifiedText => {
                self.deliver_to(&[WindowId::central_log(), WindowId::main_terminal()], kind, payload, arrival_ns);
            }
            MessageKind::InternalTxEcho => {
                self.deliver_to(&[WindowId::central_log()], kind, payload, arrival_ns);
            }
        }
    }

    fn deliver_to(&mut self, fixed: &[WindowId], kind: &MessageKind, payload: &[u8], arrival_ns: u64) {
        let extras = self.routing_table.extras_for(kind.tag()).to_vec();
        for dest in fixed.iter().chain(extras.iter()) {
            self.deliver_one(dest, kind, payload, arrival_ns);
        }
    }

    fn deliver_payload_to(&mut self, dests: &[WindowId], kind: &MessageKind, payload: &[u8], arrival_ns: u64) {
        for dest in dests {
            self.deliver_one(dest, kind, payload, arrival_ns);
        }
    }

    fn deliver_one(&mut self, dest: &WindowId, kind: &MessageKind, payload: &[u8], arrival_ns: u64) {
        match self.registry.deliver(dest, kind, payload, arrival_ns) {
            DeliverOutcome::Delivered | DeliverOutcome::Queued => {}
            DeliverOutcome::UnknownDestination => {
                warn!(window = %dest, kind = %kind, "destination not registered, dropped for this destination only");
            }
            DeliverOutcome::QueueFull => {
                self.metrics.inc_queue_full();
                warn!(window = %dest, "pre-ready queue full, message dropped");
            }
            DeliverOutcome::HandlerFailed(e) => {
                self.metrics.inc_handler_failed();
                warn!(window = %dest, error = %e, "handler failed, other destinations still receive");
            }
        }
    }

    fn publish_depths(&self) {
        self.metrics.publish_window_depths(self.registry.queue_depths());
    }
}
