use serde::Serialize;
use std::collections::BTreeSet;

use super::{Car, CarId, PriceBand};

/// Lower-cases and trims an attribute value; blank values carry no signal
pub fn normalize(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

/// Per-request summary of a user's inferred tastes
///
/// An empty dimension means "no preference", never "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub brands: BTreeSet<String>,
    pub body_types: BTreeSet<String>,
    pub fuel_types: BTreeSet<String>,
    pub transmissions: BTreeSet<String>,
    pub max_budget: Option<f64>,
    pub driving_condition: Option<String>,
}

impl PreferenceProfile {
    /// Adds the car's categorical attributes to the profile dimensions
    pub fn absorb(&mut self, car: &Car) {
        self.brands.extend(normalize(&car.brand));
        self.body_types.extend(normalize(&car.body_type));
        self.fuel_types.extend(normalize(&car.fuel_type));
        self.transmissions.extend(normalize(&car.transmission_type));
    }

    /// Raises the budget ceiling to the car's upper price, if it has one
    pub fn raise_budget(&mut self, car: &Car) {
        if let Some(price) = car.max_price_lakhs {
            self.max_budget = Some(self.max_budget.map_or(price, |budget| budget.max(price)));
        }
    }

    pub fn with_driving_condition(mut self, condition: Option<&str>) -> Self {
        self.driving_condition = condition.and_then(normalize);
        self
    }

    /// True when no dimension carries any signal
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
            && self.body_types.is_empty()
            && self.fuel_types.is_empty()
            && self.transmissions.is_empty()
            && self.max_budget.is_none()
            && self.driving_condition.is_none()
    }

    /// Store-level filter selecting cars that match at least one dimension,
    /// strongest matches first under `weights`
    pub fn candidate_filter(
        &self,
        weights: MatchWeights,
        exclude: Vec<CarId>,
        limit: usize,
    ) -> CandidateFilter {
        CandidateFilter {
            brands: self.brands.iter().cloned().collect(),
            body_types: self.body_types.iter().cloned().collect(),
            fuel_types: self.fuel_types.iter().cloned().collect(),
            transmissions: self.transmissions.iter().cloned().collect(),
            driving_condition: self.driving_condition.clone(),
            max_budget: self.max_budget,
            price_band: None,
            weights,
            exclude,
            limit,
        }
    }
}

/// Points a store awards per matched filter dimension when bounding the
/// candidate set; zero leaves a dimension out of the ordering
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchWeights {
    pub brand: f64,
    pub body_type: f64,
    pub fuel_type: f64,
    pub transmission: f64,
    pub driving_condition: f64,
    pub budget: f64,
    pub price_band: f64,
}

/// Candidate query pushed down to the catalog store
///
/// Dimensions combine with OR; empty dimensions are skipped. Values are
/// lower-cased and compared case-insensitively. Rows are returned by
/// descending [`CandidateFilter::match_strength`], then descending rating,
/// then ascending id, up to `limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    pub brands: Vec<String>,
    pub body_types: Vec<String>,
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub driving_condition: Option<String>,
    /// Matches cars whose upper price is within budget
    pub max_budget: Option<f64>,
    /// Matches cars whose price band overlaps this one
    pub price_band: Option<PriceBand>,
    pub weights: MatchWeights,
    pub exclude: Vec<CarId>,
    pub limit: usize,
}

struct DimensionHits {
    brand: bool,
    body_type: bool,
    fuel_type: bool,
    transmission: bool,
    driving_condition: bool,
    budget: bool,
    price_band: bool,
}

impl CandidateFilter {
    /// Whether any dimension is set; a filter without criteria selects nothing
    pub fn has_criteria(&self) -> bool {
        !self.brands.is_empty()
            || !self.body_types.is_empty()
            || !self.fuel_types.is_empty()
            || !self.transmissions.is_empty()
            || self.driving_condition.is_some()
            || self.max_budget.is_some()
            || self.price_band.is_some()
    }

    fn hits(&self, car: &Car) -> DimensionHits {
        let in_set = |values: &[String], attribute: &str| {
            normalize(attribute).is_some_and(|attribute| values.contains(&attribute))
        };
        let transmission = normalize(&car.transmission_type);

        DimensionHits {
            brand: in_set(&self.brands, &car.brand),
            body_type: in_set(&self.body_types, &car.body_type),
            fuel_type: in_set(&self.fuel_types, &car.fuel_type),
            transmission: in_set(&self.transmissions, &car.transmission_type),
            driving_condition: self.driving_condition.is_some()
                && self.driving_condition == transmission,
            budget: self
                .max_budget
                .zip(car.max_price_lakhs)
                .is_some_and(|(budget, price)| price <= budget),
            price_band: self
                .price_band
                .zip(car.price_band())
                .is_some_and(|(band, car_band)| band.overlaps(&car_band)),
        }
    }

    /// Reference semantics of the filter, mirrored by store implementations
    pub fn matches(&self, car: &Car) -> bool {
        if self.exclude.contains(&car.id) {
            return false;
        }

        let hits = self.hits(car);
        hits.brand
            || hits.body_type
            || hits.fuel_type
            || hits.transmission
            || hits.driving_condition
            || hits.budget
            || hits.price_band
    }

    /// Sum of the weights of the dimensions `car` matches
    pub fn match_strength(&self, car: &Car) -> f64 {
        let hits = self.hits(car);
        let w = &self.weights;
        [
            (hits.brand, w.brand),
            (hits.body_type, w.body_type),
            (hits.fuel_type, w.fuel_type),
            (hits.transmission, w.transmission),
            (hits.driving_condition, w.driving_condition),
            (hits.budget, w.budget),
            (hits.price_band, w.price_band),
        ]
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, weight)| weight)
        .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(id: CarId, brand: &str, body: &str, fuel: &str, transmission: &str, max: f64) -> Car {
        Car {
            id,
            brand: brand.to_string(),
            model: format!("Model {}", id),
            body_type: body.to_string(),
            fuel_type: fuel.to_string(),
            transmission_type: transmission.to_string(),
            min_price_lakhs: Some(max * 0.7),
            max_price_lakhs: Some(max),
            rating: 4.0,
        }
    }

    #[test]
    fn test_absorb_normalizes_and_deduplicates() {
        let mut profile = PreferenceProfile::default();
        profile.absorb(&car(1, "Hyundai", "SUV", "Petrol", "Manual", 15.0));
        profile.absorb(&car(2, " hyundai ", "suv", "Diesel", "", 12.0));

        assert_eq!(profile.brands.len(), 1);
        assert!(profile.brands.contains("hyundai"));
        assert_eq!(profile.fuel_types.len(), 2);
        assert_eq!(profile.transmissions.len(), 1);
    }

    #[test]
    fn test_raise_budget_keeps_maximum() {
        let mut profile = PreferenceProfile::default();
        profile.raise_budget(&car(1, "Kia", "SUV", "Petrol", "Manual", 18.0));
        profile.raise_budget(&car(2, "Kia", "SUV", "Petrol", "Manual", 12.0));
        assert_eq!(profile.max_budget, Some(18.0));
    }

    #[test]
    fn test_empty_profile() {
        assert!(PreferenceProfile::default().is_empty());
        let hinted = PreferenceProfile::default().with_driving_condition(Some("Automatic"));
        assert!(!hinted.is_empty());
        assert_eq!(hinted.driving_condition.as_deref(), Some("automatic"));
        assert!(PreferenceProfile::default()
            .with_driving_condition(Some("  "))
            .is_empty());
    }

    #[test]
    fn test_filter_is_or_across_dimensions() {
        let filter = CandidateFilter {
            brands: vec!["tata".to_string()],
            fuel_types: vec!["electric".to_string()],
            limit: 10,
            ..Default::default()
        };

        assert!(filter.matches(&car(1, "Tata", "Sedan", "Diesel", "Manual", 9.0)));
        assert!(filter.matches(&car(2, "MG", "SUV", "Electric", "Automatic", 25.0)));
        assert!(!filter.matches(&car(3, "Honda", "Sedan", "Petrol", "CVT", 14.0)));
    }

    #[test]
    fn test_filter_budget_and_exclusion() {
        let filter = CandidateFilter {
            max_budget: Some(10.0),
            exclude: vec![1],
            limit: 10,
            ..Default::default()
        };

        assert!(!filter.matches(&car(1, "Tata", "SUV", "Petrol", "Manual", 8.0)));
        assert!(filter.matches(&car(2, "Tata", "SUV", "Petrol", "Manual", 10.0)));
        assert!(!filter.matches(&car(3, "Tata", "SUV", "Petrol", "Manual", 10.5)));
    }

    #[test]
    fn test_match_strength_sums_matched_weights() {
        let filter = CandidateFilter {
            brands: vec!["tata".to_string()],
            fuel_types: vec!["diesel".to_string()],
            max_budget: Some(12.0),
            weights: MatchWeights {
                brand: 3.0,
                fuel_type: 1.5,
                budget: 1.5,
                ..Default::default()
            },
            limit: 10,
            ..Default::default()
        };

        assert_eq!(filter.match_strength(&car(1, "Tata", "SUV", "Diesel", "Manual", 11.0)), 6.0);
        assert_eq!(filter.match_strength(&car(2, "Kia", "SUV", "Petrol", "Manual", 11.0)), 1.5);
        assert_eq!(filter.match_strength(&car(3, "Kia", "SUV", "Petrol", "Manual", 30.0)), 0.0);
    }

    #[test]
    fn test_filter_without_criteria() {
        let filter = CandidateFilter {
            limit: 10,
            ..Default::default()
        };
        assert!(!filter.has_criteria());
        assert!(!filter.matches(&car(1, "Tata", "SUV", "Petrol", "Manual", 8.0)));
    }
}
