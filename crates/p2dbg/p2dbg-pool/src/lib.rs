//! `p2dbg-pool`: the fixed-capacity message slab shared by the extractor and
//! router (component C4).

mod error;
mod pool;

pub use error::PoolError;
pub use pool::MessagePool;
