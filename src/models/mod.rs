use serde::{Deserialize, Serialize};

mod car;
mod interaction;
mod profile;

pub use car::{Car, CarId, PriceBand};
pub use interaction::{Interaction, InteractionAction, NewInteraction};
pub use profile::{normalize, CandidateFilter, MatchWeights, PreferenceProfile};

/// Identifier of an authenticated user
pub type UserId = i64;

/// Identity of the party making a request, resolved at the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(UserId),
}

impl Caller {
    /// Returns the user id, or `Unauthenticated` for anonymous callers
    pub fn require_user(&self) -> crate::error::AppResult<UserId> {
        match self {
            Caller::User(id) => Ok(*id),
            Caller::Anonymous => Err(crate::error::AppError::Unauthenticated),
        }
    }
}

/// Why a candidate earned (part of) its score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    Brand,
    BodyType,
    FuelType,
    Transmission,
    DrivingCondition,
    Budget,
    PriceProximity,
    /// Fallback entry chosen by global rating alone
    TopRated,
}

/// A ranked recommendation with its score breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCar {
    #[serde(flatten)]
    pub car: Car,
    pub score: f64,
    pub matched: Vec<MatchSignal>,
}
