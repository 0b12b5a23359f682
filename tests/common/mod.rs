#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use car_showcase_api::{
    config::RecommenderSettings,
    error::AppResult,
    models::{CandidateFilter, Car, CarId, Interaction, InteractionAction, NewInteraction, UserId},
    services::{CatalogStore, InteractionLog, LikeStore, Recommender},
};

pub fn car(
    id: CarId,
    brand: &str,
    body_type: &str,
    fuel_type: &str,
    transmission_type: &str,
    price: (f64, f64),
    rating: f64,
) -> Car {
    Car {
        id,
        brand: brand.to_string(),
        model: format!("Model {}", id),
        body_type: body_type.to_string(),
        fuel_type: fuel_type.to_string(),
        transmission_type: transmission_type.to_string(),
        min_price_lakhs: Some(price.0),
        max_price_lakhs: Some(price.1),
        rating,
    }
}

/// Catalog held in memory, optionally slowed down per call
pub struct MemoryCatalog {
    cars: Vec<Car>,
    delay: Option<Duration>,
}

impl MemoryCatalog {
    pub fn new(cars: Vec<Car>) -> Self {
        Self { cars, delay: None }
    }

    pub fn slow(cars: Vec<Car>, delay: Duration) -> Self {
        Self {
            cars,
            delay: Some(delay),
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn by_rating(mut cars: Vec<Car>, limit: usize) -> Vec<Car> {
        cars.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));
        cars.truncate(limit);
        cars
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_by_id(&self, id: CarId) -> AppResult<Option<Car>> {
        self.pause().await;
        Ok(self.cars.iter().find(|car| car.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[CarId]) -> AppResult<Vec<Car>> {
        self.pause().await;
        Ok(self
            .cars
            .iter()
            .filter(|car| ids.contains(&car.id))
            .cloned()
            .collect())
    }

    async fn find_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Car>> {
        self.pause().await;
        let mut matching: Vec<Car> = self
            .cars
            .iter()
            .filter(|car| filter.matches(car))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            filter
                .match_strength(b)
                .total_cmp(&filter.match_strength(a))
                .then(b.rating.total_cmp(&a.rating))
                .then(a.id.cmp(&b.id))
        });
        matching.truncate(filter.limit);
        Ok(matching)
    }

    async fn find_top_rated(&self, limit: usize) -> AppResult<Vec<Car>> {
        self.pause().await;
        Ok(Self::by_rating(self.cars.clone(), limit))
    }
}

#[derive(Default)]
pub struct MemoryLikes {
    likes: Mutex<HashMap<UserId, Vec<Car>>>,
}

impl MemoryLikes {
    pub fn like(&self, user_id: UserId, car: &Car) {
        self.likes
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(car.clone());
    }
}

#[async_trait::async_trait]
impl LikeStore for MemoryLikes {
    async fn liked_cars_of(&self, user_id: UserId) -> AppResult<Vec<Car>> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryLog {
    records: Mutex<Vec<Interaction>>,
}

impl MemoryLog {
    /// Inserts a record with an explicit timestamp, e.g. to age it
    pub fn insert_at(
        &self,
        user_id: UserId,
        car_id: CarId,
        action: InteractionAction,
        occurred_at: DateTime<Utc>,
    ) {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push(Interaction {
            id,
            user_id,
            car_id,
            action,
            occurred_at,
            session_id: None,
        });
    }

    pub fn all(&self) -> Vec<Interaction> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self, user_id: UserId, action: InteractionAction) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.action == action)
            .count()
    }
}

#[async_trait::async_trait]
impl InteractionLog for MemoryLog {
    async fn append(&self, interactions: &[NewInteraction]) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        for interaction in interactions {
            let id = records.len() as i64 + 1;
            records.push(Interaction {
                id,
                user_id: interaction.user_id,
                car_id: interaction.car_id,
                action: interaction.action,
                occurred_at: interaction.occurred_at,
                session_id: interaction.session_id.clone(),
            });
        }
        Ok(())
    }

    async fn recent(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
        actions: &[InteractionAction],
    ) -> AppResult<Vec<Interaction>> {
        let mut found: Vec<Interaction> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.occurred_at >= since && actions.contains(&r.action))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn car_ids_with_action(
        &self,
        user_id: UserId,
        action: InteractionAction,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<HashSet<CarId>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.action == action)
            .filter(|r| since.map_or(true, |since| r.occurred_at >= since))
            .map(|r| r.car_id)
            .collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.occurred_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

pub struct Harness {
    pub likes: Arc<MemoryLikes>,
    pub log: Arc<MemoryLog>,
    pub recommender: Recommender,
}

pub fn harness(cars: Vec<Car>) -> Harness {
    harness_with(MemoryCatalog::new(cars), RecommenderSettings::default())
}

pub fn harness_with(catalog: MemoryCatalog, settings: RecommenderSettings) -> Harness {
    let likes = Arc::new(MemoryLikes::default());
    let log = Arc::new(MemoryLog::default());
    let recommender = Recommender::new(Arc::new(catalog), likes.clone(), log.clone(), settings);

    Harness {
        likes,
        log,
        recommender,
    }
}

/// 25 petrol SUVs sharing a brand, ratings descending with id
pub fn suv_fleet() -> Vec<Car> {
    (1..=25)
        .map(|id| {
            car(
                id,
                "Hyundai",
                "SUV",
                "Petrol",
                "Manual",
                (10.0, 15.0),
                5.0 - id as f64 * 0.1,
            )
        })
        .collect()
}
