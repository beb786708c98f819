use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool capacity must be at least 1")]
    EmptyCapacity,
    #[error("payload of {len} byte(s) exceeds the {max} byte slot limit")]
    PayloadTooLarge { len: usize, max: usize },
}
