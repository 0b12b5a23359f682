use std::sync::Arc;
use tokio::time::Instant;

use crate::{
    cached,
    config::RecommenderSettings,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Caller, CarId, InteractionAction, ScoredCar},
    services::{
        before_deadline,
        exposure::ExposureLedger,
        interactions::InteractionRecorder,
        profile::ProfileBuilder,
        scoring::CandidateScorer,
        stores::{CatalogStore, InteractionLog, LikeStore},
    },
};

/// Per-request options of the personalized flow
#[derive(Debug, Clone, Default)]
pub struct PersonalizedRequest {
    /// Preferred transmission for the user's driving, e.g. "automatic"
    pub driving_condition: Option<String>,
    /// Stored with the `shown` records written by the request
    pub session_id: Option<String>,
}

/// Entry point of the recommendation engine
///
/// Composes profile building, candidate scoring, exposure filtering and
/// exposure recording. Holds no per-user state between calls. Collaborator
/// failures propagate unchanged.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn CatalogStore>,
    log: Arc<dyn InteractionLog>,
    profiles: ProfileBuilder,
    scorer: CandidateScorer,
    exposure: ExposureLedger,
    interactions: InteractionRecorder,
    settings: RecommenderSettings,
    cache: Option<Cache>,
}

fn validate_car_id(car_id: CarId) -> AppResult<()> {
    if car_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Car id must be positive, got {}",
            car_id
        )));
    }
    Ok(())
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        likes: Arc<dyn LikeStore>,
        log: Arc<dyn InteractionLog>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            profiles: ProfileBuilder::new(
                catalog.clone(),
                likes,
                log.clone(),
                settings.profile_window,
            ),
            scorer: CandidateScorer::new(catalog.clone(), settings.candidate_pool_limit),
            exposure: ExposureLedger::new(log.clone()),
            interactions: InteractionRecorder::new(log.clone()),
            catalog,
            log,
            settings,
            cache: None,
        }
    }

    /// Caches similar-car lists and the top-rated pool in Redis
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.request_timeout
    }

    /// Cars most similar to `car_id`, excluding the car itself
    ///
    /// Not user-scoped: no exposure filtering or recording.
    pub async fn similar(&self, car_id: CarId) -> AppResult<Vec<ScoredCar>> {
        validate_car_id(car_id)?;
        let deadline = self.deadline();

        let ranked = match &self.cache {
            Some(cache) => {
                before_deadline(
                    deadline,
                    "similar cars",
                    self.similar_cached(cache, car_id, deadline),
                )
                .await?
            }
            None => self.compute_similar(car_id, deadline).await?,
        };

        tracing::info!(car_id, returned = ranked.len(), "Similar cars served");
        Ok(ranked)
    }

    async fn similar_cached(
        &self,
        cache: &Cache,
        car_id: CarId,
        deadline: Instant,
    ) -> AppResult<Vec<ScoredCar>> {
        let key = CacheKey::SimilarCars(car_id);
        cached!(
            cache,
            key,
            self.settings.cache_ttl_secs,
            self.compute_similar(car_id, deadline)
        )
    }

    async fn compute_similar(&self, car_id: CarId, deadline: Instant) -> AppResult<Vec<ScoredCar>> {
        let reference = before_deadline(deadline, "catalog lookup", self.catalog.find_by_id(car_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Car not found with id: {}", car_id)))?;

        let mut ranked =
            before_deadline(deadline, "similarity scoring", self.scorer.similar_to(&reference))
                .await?;
        ranked.truncate(self.settings.result_size);
        Ok(ranked)
    }

    /// Personalized feed for an authenticated caller
    ///
    /// Falls back to the global top-rated pool when the user has no
    /// preference signal. Dismissed and recently shown cars are removed, the
    /// page is truncated, and every returned car is recorded as shown. An
    /// empty page is a valid result.
    pub async fn personalized(
        &self,
        caller: &Caller,
        request: PersonalizedRequest,
    ) -> AppResult<Vec<ScoredCar>> {
        let user_id = caller.require_user()?;
        let deadline = self.deadline();
        let started = std::time::Instant::now();

        let profile = before_deadline(deadline, "profile build", self.profiles.build(user_id))
            .await?
            .with_driving_condition(request.driving_condition.as_deref());

        let dismissed = before_deadline(
            deadline,
            "dismissal lookup",
            self.log
                .car_ids_with_action(user_id, InteractionAction::Dismiss, None),
        )
        .await?;
        let recently_shown = before_deadline(
            deadline,
            "exposure lookup",
            self.exposure
                .recently_shown(user_id, self.settings.exposure_window),
        )
        .await?;

        let (mut ranked, mode) = if profile.is_empty() {
            let pool =
                before_deadline(deadline, "top-rated fallback", self.top_rated_pool()).await?;
            (pool, "top_rated")
        } else {
            // Excluded in the query so the bounded pool is not spent on them
            let mut exclude: Vec<CarId> =
                dismissed.union(&recently_shown).copied().collect();
            exclude.sort_unstable();
            let ranked = before_deadline(
                deadline,
                "preference scoring",
                self.scorer.matching(&profile, exclude),
            )
            .await?;
            (ranked, "preference")
        };
        ranked.retain(|scored| !dismissed.contains(&scored.car.id));

        let mut page = ExposureLedger::filter_unseen(user_id, ranked, &recently_shown);
        page.truncate(self.settings.result_size);

        let shown: Vec<CarId> = page.iter().map(|scored| scored.car.id).collect();
        before_deadline(
            deadline,
            "exposure write",
            self.exposure
                .record_shown(user_id, &shown, request.session_id.as_deref()),
        )
        .await?;

        tracing::info!(
            user_id,
            mode,
            dismissed = dismissed.len(),
            returned = page.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Personalized recommendations served"
        );

        Ok(page)
    }

    async fn top_rated_pool(&self) -> AppResult<Vec<ScoredCar>> {
        match &self.cache {
            Some(cache) => {
                let key = CacheKey::TopRated(self.settings.candidate_pool_limit);
                cached!(
                    cache,
                    key,
                    self.settings.cache_ttl_secs,
                    self.scorer.top_rated()
                )
            }
            None => self.scorer.top_rated().await,
        }
    }

    /// Records a user action on a car
    ///
    /// A dismissal takes effect from the next personalized call on.
    pub async fn record_feedback(
        &self,
        caller: &Caller,
        car_id: CarId,
        action: &str,
        session_id: Option<String>,
    ) -> AppResult<()> {
        let user_id = caller.require_user()?;
        let action: InteractionAction = action.parse()?;
        validate_car_id(car_id)?;
        let deadline = self.deadline();

        let car = before_deadline(deadline, "catalog lookup", self.catalog.find_by_id(car_id))
            .await?;
        if car.is_none() {
            return Err(AppError::NotFound(format!(
                "Car not found with id: {}",
                car_id
            )));
        }

        before_deadline(
            deadline,
            "interaction write",
            self.interactions.record(user_id, car_id, action, session_id),
        )
        .await?;

        tracing::info!(user_id, car_id, action = %action, "Feedback recorded");
        Ok(())
    }
}
