use crate::reset::ResetEvent;
use crate::slot::SlotId;

/// What travels over the boundary channel from the extractor to the router:
/// either a classified message (by slot id, so the bytes themselves never
/// copy again) or a reset boundary marker, in the exact order the extractor
/// emitted them — a reset is a marker in this same ordered stream, not a
/// side flag, so cross-window ordering around a reset falls out for free.
#[derive(Debug, Clone, Copy)]
pub enum RouterMessage {
    Slot(SlotId),
    Boundary(ResetEvent),
}
