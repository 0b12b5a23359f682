use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{CandidateFilter, Car, CarId, PriceBand},
    services::stores::CatalogStore,
};

/// Projection of the catalog's `cars` table (aliased `c`) onto [`Car`]
pub(crate) const CAR_COLUMNS: &str = "\
c.id::BIGINT AS id, COALESCE(c.brand, '') AS brand, COALESCE(c.model, '') AS model, \
COALESCE(c.body_type, '') AS body_type, COALESCE(c.fuel_type, '') AS fuel_type, \
COALESCE(c.transmission_type, '') AS transmission_type, \
c.min_price_lakhs::FLOAT8 AS min_price_lakhs, c.max_price_lakhs::FLOAT8 AS max_price_lakhs, \
COALESCE(c.rating, 0)::FLOAT8 AS rating";

/// Catalog lookups against the shared `cars` table
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One filter dimension as SQL, with the weight it earns when matched
enum Dimension {
    AnyOf(&'static str, Vec<String>),
    Equals(&'static str, String),
    AtMost(f64),
    Overlaps(PriceBand),
}

fn dimensions(filter: &CandidateFilter) -> Vec<(Dimension, f64)> {
    let w = &filter.weights;
    let mut dims = Vec::new();

    let sets = [
        ("c.brand", &filter.brands, w.brand),
        ("c.body_type", &filter.body_types, w.body_type),
        ("c.fuel_type", &filter.fuel_types, w.fuel_type),
        ("c.transmission_type", &filter.transmissions, w.transmission),
    ];
    for (column, values, weight) in sets {
        if !values.is_empty() {
            dims.push((Dimension::AnyOf(column, values.clone()), weight));
        }
    }
    if let Some(condition) = &filter.driving_condition {
        dims.push((
            Dimension::Equals("c.transmission_type", condition.clone()),
            w.driving_condition,
        ));
    }
    if let Some(budget) = filter.max_budget {
        dims.push((Dimension::AtMost(budget), w.budget));
    }
    if let Some(band) = filter.price_band {
        dims.push((Dimension::Overlaps(band), w.price_band));
    }

    dims
}

fn push_dimension(builder: &mut QueryBuilder<'static, Postgres>, dimension: &Dimension) {
    match dimension {
        Dimension::AnyOf(column, values) => {
            builder
                .push(format!("LOWER({}) = ANY(", column))
                .push_bind(values.clone())
                .push(")");
        }
        Dimension::Equals(column, value) => {
            builder
                .push(format!("LOWER({}) = ", column))
                .push_bind(value.clone());
        }
        Dimension::AtMost(budget) => {
            builder.push("c.max_price_lakhs <= ").push_bind(*budget);
        }
        Dimension::Overlaps(band) => {
            builder
                .push("(COALESCE(c.min_price_lakhs, c.max_price_lakhs) <= ")
                .push_bind(band.high)
                .push(" AND COALESCE(c.max_price_lakhs, c.min_price_lakhs) >= ")
                .push_bind(band.low)
                .push(")");
        }
    }
}

/// Builds the OR-filtered candidate query; `None` when the filter has no criteria
///
/// Rows are ordered by the weighted sum of matched dimensions before the
/// limit applies, then by rating and id.
fn candidate_query(filter: &CandidateFilter) -> Option<QueryBuilder<'static, Postgres>> {
    if !filter.has_criteria() {
        return None;
    }
    let dims = dimensions(filter);

    let mut builder = QueryBuilder::new(format!("SELECT {} FROM cars c WHERE (", CAR_COLUMNS));
    for (i, (dimension, _)) in dims.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        push_dimension(&mut builder, dimension);
    }
    builder.push(")");

    if !filter.exclude.is_empty() {
        builder
            .push(" AND c.id <> ALL(")
            .push_bind(filter.exclude.clone())
            .push(")");
    }

    builder.push(" ORDER BY (0");
    for (dimension, weight) in dims.iter().filter(|(_, weight)| *weight > 0.0) {
        builder.push(" + CASE WHEN ");
        push_dimension(&mut builder, dimension);
        builder.push(" THEN ").push_bind(*weight).push(" ELSE 0 END");
    }
    builder
        .push(") DESC, rating DESC, id ASC LIMIT ")
        .push_bind(filter.limit as i64);

    Some(builder)
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_id(&self, id: CarId) -> AppResult<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars c WHERE c.id = $1",
            CAR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(car)
    }

    async fn find_by_ids(&self, ids: &[CarId]) -> AppResult<Vec<Car>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cars = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars c WHERE c.id = ANY($1)",
            CAR_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }

    async fn find_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Car>> {
        let Some(mut builder) = candidate_query(filter) else {
            return Ok(Vec::new());
        };

        let cars = builder
            .build_query_as::<Car>()
            .fetch_all(&self.pool)
            .await?;

        Ok(cars)
    }

    async fn find_top_rated(&self, limit: usize) -> AppResult<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars c ORDER BY rating DESC, id ASC LIMIT $1",
            CAR_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchWeights;

    #[test]
    fn test_candidate_query_skips_empty_dimensions() {
        let filter = CandidateFilter {
            brands: vec!["tata".to_string()],
            max_budget: Some(20.0),
            limit: 50,
            ..Default::default()
        };

        let sql = candidate_query(&filter).unwrap().into_sql();
        assert!(sql.contains("WHERE (LOWER(c.brand) = ANY($1) OR c.max_price_lakhs <= $2)"));
        assert!(!sql.contains("c.body_type) = ANY"));
        assert!(!sql.contains("<> ALL"));
        assert!(sql.ends_with("ORDER BY (0) DESC, rating DESC, id ASC LIMIT $3"));
    }

    #[test]
    fn test_candidate_query_with_band_and_exclusions() {
        let filter = CandidateFilter {
            fuel_types: vec!["diesel".to_string()],
            price_band: Some(PriceBand::new(8.5, 23.0)),
            exclude: vec![5],
            limit: 10,
            ..Default::default()
        };

        let sql = candidate_query(&filter).unwrap().into_sql();
        assert!(sql.contains("LOWER(c.fuel_type) = ANY($1)"));
        assert!(sql.contains("COALESCE(c.min_price_lakhs, c.max_price_lakhs) <= $2"));
        assert!(sql.contains("COALESCE(c.max_price_lakhs, c.min_price_lakhs) >= $3"));
        assert!(sql.contains(") AND c.id <> ALL($4)"));
    }

    #[test]
    fn test_candidate_query_orders_by_weighted_match_before_limit() {
        let filter = CandidateFilter {
            brands: vec!["hyundai".to_string()],
            body_types: vec!["suv".to_string()],
            max_budget: Some(19.5),
            weights: MatchWeights {
                brand: 3.0,
                body_type: 2.0,
                budget: 1.5,
                ..Default::default()
            },
            limit: 500,
            ..Default::default()
        };

        let sql = candidate_query(&filter).unwrap().into_sql();
        assert!(sql.contains(
            "ORDER BY (0 + CASE WHEN LOWER(c.brand) = ANY($4) THEN $5 ELSE 0 END \
             + CASE WHEN LOWER(c.body_type) = ANY($6) THEN $7 ELSE 0 END \
             + CASE WHEN c.max_price_lakhs <= $8 THEN $9 ELSE 0 END) DESC, rating DESC, id ASC LIMIT $10"
        ));
    }

    #[test]
    fn test_candidate_query_without_criteria() {
        let filter = CandidateFilter {
            exclude: vec![1, 2],
            limit: 10,
            ..Default::default()
        };
        assert!(candidate_query(&filter).is_none());
    }
}
