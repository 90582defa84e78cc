use swarm_client::SourceError;
use thiserror::Error;

pub type Result<T, E = SyncError> = core::result::Result<T, E>;

/// Why a pipeline tick produced no new data.
///
/// None of these are fatal: the pipeline keeps its state and tries again on
/// the next tick.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("pipeline stopped; result discarded")]
    Stopped,
    #[error("log filter changed during fetch; result discarded")]
    FilterChanged,
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
