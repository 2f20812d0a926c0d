use thiserror::Error;

use super::JoinError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Join invariant violated: {0}")]
    Join(#[from] JoinError),
    #[error("Pipeline drain task failed: {source}")]
    DrainTask {
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("Pipeline has no sources.")]
    NoSources,
}
