use thiserror::Error;

/// Non-fatal: the extractor recovers from both locally and keeps running.
/// Never returned from the extractor's run loop — consumed as counters and
/// `tracing` events instead.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("line exceeded the {budget} byte budget without a terminator")]
    LineBudgetExceeded { budget: usize },

    #[error("classification lost sync after a partial match")]
    SyncLost,
}
