use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CarId, InteractionAction, NewInteraction, ScoredCar, UserId},
    services::stores::InteractionLog,
};

/// Suppresses cars a user was recently shown
///
/// Exposure records are the `shown` subset of the interaction log. Filtering
/// and recording are separate statements, so two concurrent requests for the
/// same user may both show a car; that duplicate is tolerated.
#[derive(Clone)]
pub struct ExposureLedger {
    log: Arc<dyn InteractionLog>,
}

impl ExposureLedger {
    pub fn new(log: Arc<dyn InteractionLog>) -> Self {
        Self { log }
    }

    /// Cars shown to the user within `window`
    pub async fn recently_shown(
        &self,
        user_id: UserId,
        window: chrono::Duration,
    ) -> AppResult<HashSet<CarId>> {
        let since = Utc::now() - window;
        self.log
            .car_ids_with_action(user_id, InteractionAction::Shown, Some(since))
            .await
    }

    /// Removes candidates found in `shown`, keeping order
    pub fn filter_unseen(
        user_id: UserId,
        candidates: Vec<ScoredCar>,
        shown: &HashSet<CarId>,
    ) -> Vec<ScoredCar> {
        let before = candidates.len();
        let unseen: Vec<ScoredCar> = candidates
            .into_iter()
            .filter(|scored| !shown.contains(&scored.car.id))
            .collect();

        tracing::debug!(
            user_id,
            suppressed = before - unseen.len(),
            remaining = unseen.len(),
            "Exposure filter applied"
        );

        unseen
    }

    /// Appends one `shown` record per car
    pub async fn record_shown(
        &self,
        user_id: UserId,
        car_ids: &[CarId],
        session_id: Option<&str>,
    ) -> AppResult<()> {
        if car_ids.is_empty() {
            return Ok(());
        }

        let occurred_at = Utc::now();
        let records: Vec<NewInteraction> = car_ids
            .iter()
            .map(|&car_id| NewInteraction {
                user_id,
                car_id,
                action: InteractionAction::Shown,
                occurred_at,
                session_id: session_id.map(str::to_string),
            })
            .collect();

        self.log.append(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Car, MatchSignal};
    use crate::services::stores::MockInteractionLog;

    fn scored(id: CarId) -> ScoredCar {
        ScoredCar {
            car: Car {
                id,
                brand: "Honda".to_string(),
                model: format!("Model {}", id),
                body_type: "Sedan".to_string(),
                fuel_type: "Petrol".to_string(),
                transmission_type: "CVT".to_string(),
                min_price_lakhs: Some(11.0),
                max_price_lakhs: Some(16.0),
                rating: 4.1,
            },
            score: 2.0,
            matched: vec![MatchSignal::BodyType],
        }
    }

    #[tokio::test]
    async fn test_recently_shown_queries_within_window() {
        let mut log = MockInteractionLog::new();
        log.expect_car_ids_with_action()
            .withf(|user, action, since| {
                *user == 3
                    && *action == InteractionAction::Shown
                    && since.is_some_and(|since| since < Utc::now() - chrono::Duration::days(6))
            })
            .times(1)
            .returning(|_, _, _| Ok(HashSet::from([2, 4])));

        let ledger = ExposureLedger::new(Arc::new(log));
        let shown = ledger
            .recently_shown(3, chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(shown, HashSet::from([2, 4]));
    }

    #[test]
    fn test_filter_unseen_drops_shown_and_keeps_order() {
        let unseen =
            ExposureLedger::filter_unseen(3, (1..=5).map(scored).collect(), &HashSet::from([2, 4]));

        let ids: Vec<CarId> = unseen.iter().map(|s| s.car.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_record_shown_writes_one_record_per_car() {
        let mut log = MockInteractionLog::new();
        log.expect_append()
            .withf(|batch| {
                batch.len() == 3
                    && batch.iter().all(|record| {
                        record.action == InteractionAction::Shown
                            && record.user_id == 9
                            && record.session_id.as_deref() == Some("abc")
                    })
            })
            .times(1)
            .returning(|_| Ok(()));

        let ledger = ExposureLedger::new(Arc::new(log));
        ledger
            .record_shown(9, &[4, 5, 6], Some("abc"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_record_shown_noop_for_empty_page() {
        let mut log = MockInteractionLog::new();
        log.expect_append().never();

        let ledger = ExposureLedger::new(Arc::new(log));
        tokio_test::assert_ok!(ledger.record_shown(9, &[], None).await);
    }
}
