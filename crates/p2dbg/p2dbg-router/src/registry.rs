//! The window registry (component C5's "window router" tier): a
//! `HashMap<WindowId, WindowEntry>` rather than a flat array — window ids
//! are free-form user strings, not a bounded dense integer space, so
//! array-indexing doesn't apply here (see DESIGN.md). Owned exclusively by
//! the router thread; every other thread reaches it only through
//! `RouterCommand`.

use p2dbg_core::{HandlerError, MessageKind, WindowHandler};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// A message buffered for a window whose instance exists but isn't ready
/// yet (two-phase registration, pre-ready queue).
pub struct Pending {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
    pub arrival_ns: u64,
}

pub struct WindowEntry {
    pub handler: Option<Box<dyn WindowHandler>>,
    pending: VecDeque<Pending>,
    pre_ready_cap: usize,
}

impl WindowEntry {
    fn new(pre_ready_cap: usize) -> Self {
        Self {
            handler: None,
            pending: VecDeque::new(),
            pre_ready_cap,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.handler.is_some()
    }

    pub fn queue_depth(&self) -> usize {
        self.pending.len()
    }
}

/// Registry of window instances/handlers, keyed by `WindowId`.
pub struct WindowRegistry {
    entries: HashMap<p2dbg_core::WindowId, WindowEntry>,
    pre_ready_cap: usize,
}

impl WindowRegistry {
    pub fn new(pre_ready_cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            pre_ready_cap,
        }
    }

    pub fn register_instance(&mut self, id: p2dbg_core::WindowId) {
        self.entries.entry(id).or_insert_with(|| WindowEntry::new(self.pre_ready_cap));
    }

    /// Attaches `handler`, transitions to ready, and drains the pre-ready
    /// queue in order before any new message is delivered.
    pub fn register_handler(&mut self, id: p2dbg_core::WindowId, mut handler: Box<dyn WindowHandler>) {
        handler.on_ready();
        let entry = self.entries.entry(id.clone()).or_insert_with(|| WindowEntry::new(self.pre_ready_cap));
        while let Some(p) = entry.pending.pop_front() {
            if let Err(e) = handler.handle(&p.kind, &p.payload, p.arrival_ns) {
                warn!(window = %id, error = %e, "handler failed draining pre-ready queue");
            }
        }
        entry.handler = Some(handler);
    }

    pub fn unregister(&mut self, id: &p2dbg_core::WindowId) {
        if let Some(mut entry) = self.entries.remove(id) {
            if let Some(h) = entry.handler.as_mut() {
                h.on_close();
            }
        }
    }

    pub fn rotate_all(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some(h) = entry.handler.as_mut() {
                h.on_rotate();
            }
        }
    }

    pub fn get_mut(&mut self, id: &p2dbg_core::WindowId) -> Option<&mut WindowEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &p2dbg_core::WindowId) -> bool {
        self.entries.contains_key(id)
    }

    /// Delivers a message to `id`: runs the handler synchronously if ready,
    /// otherwise buffers it in the pre-ready queue (bounded; full queue
    /// drops the message with the caller's `on_queue_full`). Missing
    /// destinations are the caller's problem (`UnknownDestination`).
    pub fn deliver(
        &mut self,
        id: &p2dbg_core::WindowId,
        kind: &MessageKind,
        payload: &[u8],
        arrival_ns: u64,
    ) -> DeliverOutcome {
        let Some(entry) = self.entries.get_mut(id) else {
            return DeliverOutcome::UnknownDestination;
        };
        if let Some(handler) = entry.handler.as_mut() {
            return match handler.handle(kind, payload, arrival_ns) {
                Ok(()) => DeliverOutcome::Delivered,
                Err(e) => DeliverOutcome::HandlerFailed(e),
            };
        }
        if entry.pending.len() >= entry.pre_ready_cap {
            return DeliverOutcome::QueueFull;
        }
        entry.pending.push_back(Pending {
            kind: kind.clone(),
            payload: payload.to_vec(),
            arrival_ns,
        });
        DeliverOutcome::Queued
    }

    /// Snapshot of pre-ready queue depth per window, for `Metrics::publish_window_depths`.
    pub fn queue_depths(&self) -> HashMap<p2dbg_core::WindowId, usize> {
        self.entries.iter().map(|(id, e)| (id.clone(), e.queue_depth())).collect()
    }
}

pub enum DeliverOutcome {
    Delivered,
    Queued,
    QueueFull,
    UnknownDestination,
    HandlerFailed(HandlerError),
}
