use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{CarId, UserId};
use crate::error::AppError;

/// A user action on a car, as recorded in the interaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    /// The car was returned in a personalized result set
    Shown,
    View,
    Like,
    /// Excludes the car from personalized results until the record ages out
    Dismiss,
}

impl InteractionAction {
    pub const ALL: [InteractionAction; 4] = [
        InteractionAction::Shown,
        InteractionAction::View,
        InteractionAction::Like,
        InteractionAction::Dismiss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::Shown => "shown",
            InteractionAction::View => "view",
            InteractionAction::Like => "like",
            InteractionAction::Dismiss => "dismiss",
        }
    }

    /// Actions counted as positive taste signal when building a profile
    pub fn is_positive_signal(&self) -> bool {
        matches!(self, InteractionAction::View | InteractionAction::Like)
    }
}

impl Display for InteractionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Invalid action '{}': expected one of shown, view, like, dismiss",
                    s
                ))
            })
    }
}

/// An interaction to append to the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub car_id: CarId,
    pub action: InteractionAction,
    pub occurred_at: DateTime<Utc>,
    pub session_id: Option<String>,
}

/// A stored, immutable interaction record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub id: i64,
    pub user_id: UserId,
    pub car_id: CarId,
    pub action: InteractionAction,
    pub occurred_at: DateTime<Utc>,
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_actions() {
        assert_eq!("view".parse::<InteractionAction>().unwrap(), InteractionAction::View);
        assert_eq!(
            " Dismiss ".parse::<InteractionAction>().unwrap(),
            InteractionAction::Dismiss
        );
        for action in InteractionAction::ALL {
            assert_eq!(action.as_str().parse::<InteractionAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = "click".parse::<InteractionAction>().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn test_positive_signal_excludes_dismiss_and_shown() {
        assert!(InteractionAction::Like.is_positive_signal());
        assert!(InteractionAction::View.is_positive_signal());
        assert!(!InteractionAction::Dismiss.is_positive_signal());
        assert!(!InteractionAction::Shown.is_positive_signal());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&InteractionAction::Dismiss).unwrap();
        assert_eq!(json, "\"dismiss\"");
    }
}
