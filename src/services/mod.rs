use std::future::Future;
use tokio::time::Instant;

use crate::error::{AppError, AppResult};

pub mod exposure;
pub mod interactions;
pub mod profile;
pub mod recommendations;
pub mod retention;
pub mod scoring;
pub mod stores;

pub use exposure::ExposureLedger;
pub use interactions::InteractionRecorder;
pub use profile::ProfileBuilder;
pub use recommendations::{PersonalizedRequest, Recommender};
pub use retention::{sweep_once, RetentionSweeper, SweeperHandle};
pub use scoring::CandidateScorer;
pub use stores::{CatalogStore, InteractionLog, LikeStore};

/// Runs a request-scoped operation against the request deadline
///
/// Fails with [`AppError::Timeout`] naming `operation` instead of blocking
/// past `deadline`.
pub(crate) async fn before_deadline<T, F>(
    deadline: Instant,
    operation: &'static str,
    future: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout_at(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, "Request deadline exceeded");
            Err(AppError::Timeout(operation))
        }
    }
}
