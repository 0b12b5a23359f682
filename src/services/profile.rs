use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CarId, InteractionAction, PreferenceProfile, UserId},
    services::stores::{CatalogStore, InteractionLog, LikeStore},
};

const SIGNAL_ACTIONS: [InteractionAction; 2] = [InteractionAction::Like, InteractionAction::View];

/// Derives a user's preference profile from likes and recent interactions
///
/// Read-only and rebuilt on every call. Sparse or absent signal yields an
/// empty profile rather than an error.
#[derive(Clone)]
pub struct ProfileBuilder {
    catalog: Arc<dyn CatalogStore>,
    likes: Arc<dyn LikeStore>,
    log: Arc<dyn InteractionLog>,
    window: chrono::Duration,
}

impl ProfileBuilder {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        likes: Arc<dyn LikeStore>,
        log: Arc<dyn InteractionLog>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            catalog,
            likes,
            log,
            window,
        }
    }

    pub async fn build(&self, user_id: UserId) -> AppResult<PreferenceProfile> {
        let mut profile = PreferenceProfile::default();

        // Liked cars drive both the attribute sets and the budget ceiling
        let liked = self.likes.liked_cars_of(user_id).await?;
        let liked_ids: HashSet<CarId> = liked.iter().map(|car| car.id).collect();
        for car in &liked {
            profile.absorb(car);
            profile.raise_budget(car);
        }

        let since = Utc::now() - self.window;
        let interactions = self.log.recent(user_id, since, &SIGNAL_ACTIONS).await?;

        let mut seen = HashSet::new();
        let signal_ids: Vec<CarId> = interactions
            .iter()
            .filter(|interaction| interaction.action.is_positive_signal())
            .map(|interaction| interaction.car_id)
            .filter(|id| !liked_ids.contains(id) && seen.insert(*id))
            .collect();

        if !signal_ids.is_empty() {
            for car in self.catalog.find_by_ids(&signal_ids).await? {
                profile.absorb(&car);
            }
        }

        tracing::debug!(
            user_id,
            liked = liked.len(),
            interacted = signal_ids.len(),
            brands = profile.brands.len(),
            body_types = profile.body_types.len(),
            budget = ?profile.max_budget,
            "Preference profile built"
        );

        Ok(profile)
    }
}
