//! Supplementary static destinations per message kind, configured at startup
//! and mutable only on the router's own thread. The *required* destinations
//! for each kind (central log, `cog-{n}`, `debugger-{n}`, the backtick
//! window-creator/update targets) are fixed and computed directly in
//! `router::dispatch_kind` rather than stored here — this table only holds
//! additional destinations an operator wants every message of a kind copied
//! to (e.g. an extra audit window), on top of the fixed semantics.
use p2dbg_core::WindowId;
use std::collections::HashMap;

#[derive(Default)]
pub struct RoutingTable {
    extra: HashMap<&'static str, Vec<WindowId>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `dest` as an extra destination for every message whose
    /// `MessageKind::tag()` is `kind_tag`. Only callable from the router
    /// thread (the struct isn't `Send`-shared; it lives inside `Router`).
    pub fn add_extra(&mut self, kind_tag: &'static str, dest: WindowId) {
        self.extra.entry(kind_tag).or_default().push(dest);
    }

    pub fn extras_for(&self, kind_tag: &str) -> &[WindowId] {
        self.extra.get(kind_tag).map(Vec::as_slice).unwrap_or(&[])
    }
}
