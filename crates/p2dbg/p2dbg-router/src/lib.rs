//! `p2dbg-router`: the two-tier router (component C5) — kind router +
//! window router, dispatching classified messages to registered window
//! handlers with ordering preserved across reset boundaries.

mod error;
mod registry;
mod router;
mod routing_table;

pub use error::RouterError;
pub use router::Router;
pub use routing_table::RoutingTable;
