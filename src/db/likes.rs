use sqlx::PgPool;

use crate::{
    db::catalog::CAR_COLUMNS,
    error::AppResult,
    models::{Car, UserId},
    services::stores::LikeStore,
};

/// Reads explicit likes from the catalog's `likes` table
#[derive(Clone)]
pub struct PgLikeStore {
    pool: PgPool,
}

impl PgLikeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LikeStore for PgLikeStore {
    async fn liked_cars_of(&self, user_id: UserId) -> AppResult<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(&format!(
            "SELECT DISTINCT {} FROM likes l JOIN cars c ON c.id = l.car_id WHERE l.user_id = $1",
            CAR_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }
}
