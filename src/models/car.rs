use serde::{Deserialize, Serialize};

/// Catalog identifier of a car
pub type CarId = i64;

/// Read-only projection of a catalog car used for ranking
///
/// Prices are expressed in lakhs of rupees. Either bound may be missing in
/// the catalog; a missing bound never matches a budget or price-band check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: CarId,
    pub brand: String,
    pub model: String,
    pub body_type: String,
    pub fuel_type: String,
    pub transmission_type: String,
    pub min_price_lakhs: Option<f64>,
    pub max_price_lakhs: Option<f64>,
    pub rating: f64,
}

impl Car {
    /// The car's price band, falling back to the single known bound
    pub fn price_band(&self) -> Option<PriceBand> {
        match (self.min_price_lakhs, self.max_price_lakhs) {
            (Some(low), Some(high)) => Some(PriceBand::new(low, high)),
            (Some(only), None) | (None, Some(only)) => Some(PriceBand::new(only, only)),
            (None, None) => None,
        }
    }
}

/// Inclusive price range in lakhs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: f64,
    pub high: f64,
}

impl PriceBand {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Widens both ends by `fraction` of their own value
    pub fn widened(&self, fraction: f64) -> Self {
        Self::new(self.low * (1.0 - fraction), self.high * (1.0 + fraction))
    }

    pub fn overlaps(&self, other: &PriceBand) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}
