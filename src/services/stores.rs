//! Collaborator contracts consumed by the recommendation engine
//!
//! The catalog and like stores are owned by other services and only read
//! here. The interaction log is the engine's own append-only store.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{CandidateFilter, Car, CarId, Interaction, InteractionAction, NewInteraction, UserId},
};

/// Read-only access to the car catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_id(&self, id: CarId) -> AppResult<Option<Car>>;

    /// Fetches the cars with the given ids; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[CarId]) -> AppResult<Vec<Car>>;

    /// Runs the OR-filter described by [`CandidateFilter`]
    async fn find_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Car>>;

    /// Highest rated cars first, ties by ascending id
    async fn find_top_rated(&self, limit: usize) -> AppResult<Vec<Car>>;
}

/// Read-only access to users' favorited cars
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LikeStore: Send + Sync {
    async fn liked_cars_of(&self, user_id: UserId) -> AppResult<Vec<Car>>;
}

/// Append-only interaction storage
///
/// Records are never updated. Deletion happens only through
/// [`InteractionLog::delete_before`], driven by the retention sweeper.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionLog: Send + Sync {
    async fn append(&self, interactions: &[NewInteraction]) -> AppResult<()>;

    /// The user's interactions with one of `actions` since `since`, newest first
    async fn recent(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
        actions: &[InteractionAction],
    ) -> AppResult<Vec<Interaction>>;

    /// Distinct cars the user acted on with `action`, optionally bounded in time
    async fn car_ids_with_action(
        &self,
        user_id: UserId,
        action: InteractionAction,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<HashSet<CarId>>;

    /// Bulk-deletes every record older than `cutoff`, returning the count
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}
