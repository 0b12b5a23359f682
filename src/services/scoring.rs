//! Candidate scoring and ranking
//!
//! Two modes share one ordering: descending score, then descending rating,
//! then ascending id. Candidate sets come from a single bounded store query
//! that ranks rows by the same weights before cutting them off, so the bound
//! never drops a stronger match in favour of a weaker one. Scores computed
//! here remain authoritative.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        normalize, CandidateFilter, Car, CarId, MatchSignal, MatchWeights, PreferenceProfile,
        ScoredCar,
    },
    services::stores::CatalogStore,
};

pub const BRAND_WEIGHT: f64 = 3.0;
pub const BODY_TYPE_WEIGHT: f64 = 2.0;
pub const FUEL_TYPE_WEIGHT: f64 = 1.5;
pub const TRANSMISSION_WEIGHT: f64 = 1.5;
pub const DRIVING_CONDITION_WEIGHT: f64 = 1.0;
pub const BUDGET_WEIGHT: f64 = 1.5;

/// Each matching categorical attribute in similarity mode
pub const SIMILARITY_ATTRIBUTE_POINT: f64 = 1.0;
pub const PRICE_PROXIMITY_BONUS: f64 = 1.0;
/// Reference price band is widened by this fraction on both ends
pub const PRICE_PROXIMITY_TOLERANCE: f64 = 0.15;

/// Store-side ordering of preference candidates, equal to [`score_preference`]
pub const PREFERENCE_WEIGHTS: MatchWeights = MatchWeights {
    brand: BRAND_WEIGHT,
    body_type: BODY_TYPE_WEIGHT,
    fuel_type: FUEL_TYPE_WEIGHT,
    transmission: TRANSMISSION_WEIGHT,
    driving_condition: DRIVING_CONDITION_WEIGHT,
    budget: BUDGET_WEIGHT,
    price_band: 0.0,
};

/// Store-side ordering of similarity candidates, equal to [`score_similarity`]
pub const SIMILARITY_WEIGHTS: MatchWeights = MatchWeights {
    brand: SIMILARITY_ATTRIBUTE_POINT,
    body_type: SIMILARITY_ATTRIBUTE_POINT,
    fuel_type: SIMILARITY_ATTRIBUTE_POINT,
    transmission: SIMILARITY_ATTRIBUTE_POINT,
    driving_condition: 0.0,
    budget: 0.0,
    price_band: PRICE_PROXIMITY_BONUS,
};

/// Total order used by every ranking produced by the engine
pub fn rank_order(a: &ScoredCar, b: &ScoredCar) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.car.rating.total_cmp(&a.car.rating))
        .then_with(|| a.car.id.cmp(&b.car.id))
}

fn same_attribute(a: &str, b: &str) -> bool {
    matches!((normalize(a), normalize(b)), (Some(a), Some(b)) if a == b)
}

fn dedup_by_id(candidates: Vec<Car>) -> impl Iterator<Item = Car> {
    let mut seen = HashSet::new();
    candidates.into_iter().filter(move |car| seen.insert(car.id))
}

/// Store filter for cars sharing any attribute or the price band of `reference`
pub fn similarity_filter(reference: &Car, limit: usize) -> CandidateFilter {
    CandidateFilter {
        brands: normalize(&reference.brand).into_iter().collect(),
        body_types: normalize(&reference.body_type).into_iter().collect(),
        fuel_types: normalize(&reference.fuel_type).into_iter().collect(),
        transmissions: normalize(&reference.transmission_type).into_iter().collect(),
        driving_condition: None,
        max_budget: None,
        price_band: reference
            .price_band()
            .map(|band| band.widened(PRICE_PROXIMITY_TOLERANCE)),
        weights: SIMILARITY_WEIGHTS,
        exclude: vec![reference.id],
        limit,
    }
}

/// Scores one candidate against a reference car
pub fn score_similarity(reference: &Car, candidate: &Car) -> ScoredCar {
    let mut score = 0.0;
    let mut matched = Vec::new();

    let attributes = [
        (&reference.brand, &candidate.brand, MatchSignal::Brand),
        (&reference.body_type, &candidate.body_type, MatchSignal::BodyType),
        (&reference.fuel_type, &candidate.fuel_type, MatchSignal::FuelType),
        (
            &reference.transmission_type,
            &candidate.transmission_type,
            MatchSignal::Transmission,
        ),
    ];
    for (expected, actual, signal) in attributes {
        if same_attribute(expected, actual) {
            score += SIMILARITY_ATTRIBUTE_POINT;
            matched.push(signal);
        }
    }

    let near_in_price = reference
        .price_band()
        .map(|band| band.widened(PRICE_PROXIMITY_TOLERANCE))
        .zip(candidate.price_band())
        .is_some_and(|(band, candidate_band)| band.overlaps(&candidate_band));
    if near_in_price {
        score += PRICE_PROXIMITY_BONUS;
        matched.push(MatchSignal::PriceProximity);
    }

    ScoredCar {
        car: candidate.clone(),
        score,
        matched,
    }
}

/// Ranks candidates by similarity to `reference`, never including it
pub fn rank_similar(reference: &Car, candidates: Vec<Car>) -> Vec<ScoredCar> {
    let mut ranked: Vec<ScoredCar> = dedup_by_id(candidates)
        .filter(|car| car.id != reference.id)
        .map(|car| score_similarity(reference, &car))
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// Scores one candidate against a preference profile
///
/// Absent profile dimensions (empty sets, no budget, no driving condition)
/// contribute nothing rather than counting as a mismatch.
pub fn score_preference(profile: &PreferenceProfile, candidate: &Car) -> ScoredCar {
    let mut score = 0.0;
    let mut matched = Vec::new();
    let mut award = |hit: bool, weight: f64, signal: MatchSignal| {
        if hit {
            score += weight;
            matched.push(signal);
        }
    };

    let in_set = |values: &std::collections::BTreeSet<String>, attribute: &str| {
        normalize(attribute).is_some_and(|attribute| values.contains(&attribute))
    };
    let transmission = normalize(&candidate.transmission_type);

    award(
        in_set(&profile.brands, &candidate.brand),
        BRAND_WEIGHT,
        MatchSignal::Brand,
    );
    award(
        in_set(&profile.body_types, &candidate.body_type),
        BODY_TYPE_WEIGHT,
        MatchSignal::BodyType,
    );
    award(
        in_set(&profile.fuel_types, &candidate.fuel_type),
        FUEL_TYPE_WEIGHT,
        MatchSignal::FuelType,
    );
    award(
        in_set(&profile.transmissions, &candidate.transmission_type),
        TRANSMISSION_WEIGHT,
        MatchSignal::Transmission,
    );
    award(
        profile.driving_condition.is_some() && profile.driving_condition == transmission,
        DRIVING_CONDITION_WEIGHT,
        MatchSignal::DrivingCondition,
    );
    award(
        profile
            .max_budget
            .zip(candidate.max_price_lakhs)
            .is_some_and(|(budget, price)| price <= budget),
        BUDGET_WEIGHT,
        MatchSignal::Budget,
    );

    ScoredCar {
        car: candidate.clone(),
        score,
        matched,
    }
}

/// Ranks candidates by weighted preference match, dropping zero scores
pub fn rank_by_preference(profile: &PreferenceProfile, candidates: Vec<Car>) -> Vec<ScoredCar> {
    let mut ranked: Vec<ScoredCar> = dedup_by_id(candidates)
        .map(|car| score_preference(profile, &car))
        .filter(|scored| scored.score > 0.0)
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// Global fallback ranking: rating alone, flagged as such
pub fn rank_top_rated(candidates: Vec<Car>) -> Vec<ScoredCar> {
    let mut ranked: Vec<ScoredCar> = dedup_by_id(candidates)
        .map(|car| ScoredCar {
            car,
            score: 0.0,
            matched: vec![MatchSignal::TopRated],
        })
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// Fetches candidate sets from the catalog and ranks them
#[derive(Clone)]
pub struct CandidateScorer {
    catalog: Arc<dyn CatalogStore>,
    pool_limit: usize,
}

impl CandidateScorer {
    pub fn new(catalog: Arc<dyn CatalogStore>, pool_limit: usize) -> Self {
        Self {
            catalog,
            pool_limit,
        }
    }

    /// Similarity mode
    pub async fn similar_to(&self, reference: &Car) -> AppResult<Vec<ScoredCar>> {
        let filter = similarity_filter(reference, self.pool_limit);
        let candidates = self.catalog.find_candidates(&filter).await?;

        tracing::debug!(
            car_id = reference.id,
            candidates = candidates.len(),
            "Scoring similarity candidates"
        );

        Ok(rank_similar(reference, candidates))
    }

    /// Preference mode; `exclude` is pushed down to the store query
    pub async fn matching(
        &self,
        profile: &PreferenceProfile,
        exclude: Vec<CarId>,
    ) -> AppResult<Vec<ScoredCar>> {
        let filter = profile.candidate_filter(PREFERENCE_WEIGHTS, exclude, self.pool_limit);
        if !filter.has_criteria() {
            return Ok(Vec::new());
        }

        let candidates = self.catalog.find_candidates(&filter).await?;

        tracing::debug!(
            candidates = candidates.len(),
            "Scoring preference candidates"
        );

        Ok(rank_by_preference(profile, candidates))
    }

    /// Fallback for users without any preference signal
    pub async fn top_rated(&self) -> AppResult<Vec<ScoredCar>> {
        let candidates = self.catalog.find_top_rated(self.pool_limit).await?;
        Ok(rank_top_rated(candidates))
    }
}
