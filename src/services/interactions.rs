use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CarId, InteractionAction, NewInteraction, UserId},
    services::stores::InteractionLog,
};

/// Appends user actions to the interaction log
///
/// Trusts its caller: the car id is validated against the catalog by the
/// orchestrator before anything reaches this type. Duplicate records are
/// expected and kept.
#[derive(Clone)]
pub struct InteractionRecorder {
    log: Arc<dyn InteractionLog>,
}

impl InteractionRecorder {
    pub fn new(log: Arc<dyn InteractionLog>) -> Self {
        Self { log }
    }

    pub async fn record(
        &self,
        user_id: UserId,
        car_id: CarId,
        action: InteractionAction,
        session_id: Option<String>,
    ) -> AppResult<()> {
        let interaction = NewInteraction {
            user_id,
            car_id,
            action,
            occurred_at: Utc::now(),
            session_id,
        };

        self.log.append(std::slice::from_ref(&interaction)).await?;

        tracing::debug!(user_id, car_id, action = %action, "Interaction recorded");
        Ok(())
    }
}
