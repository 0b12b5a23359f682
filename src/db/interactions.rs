use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{CarId, Interaction, InteractionAction, NewInteraction, UserId},
    services::stores::InteractionLog,
};

/// Interaction log backed by the `recommendation_history` table
#[derive(Clone)]
pub struct PgInteractionLog {
    pool: PgPool,
}

impl PgInteractionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    id: i64,
    user_id: i64,
    car_id: i64,
    action: String,
    occurred_at: DateTime<Utc>,
    session_id: Option<String>,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = AppError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let action = row.action.parse::<InteractionAction>().map_err(|_| {
            AppError::Internal(format!(
                "Unknown action '{}' stored for interaction {}",
                row.action, row.id
            ))
        })?;

        Ok(Interaction {
            id: row.id,
            user_id: row.user_id,
            car_id: row.car_id,
            action,
            occurred_at: row.occurred_at,
            session_id: row.session_id,
        })
    }
}

#[async_trait::async_trait]
impl InteractionLog for PgInteractionLog {
    async fn append(&self, interactions: &[NewInteraction]) -> AppResult<()> {
        if interactions.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recommendation_history (user_id, car_id, action, occurred_at, session_id) ",
        );
        builder.push_values(interactions, |mut row, interaction| {
            row.push_bind(interaction.user_id)
                .push_bind(interaction.car_id)
                .push_bind(interaction.action.as_str())
                .push_bind(interaction.occurred_at)
                .push_bind(interaction.session_id.clone());
        });
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn recent(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
        actions: &[InteractionAction],
    ) -> AppResult<Vec<Interaction>> {
        let actions: Vec<String> = actions.iter().map(|a| a.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT id, user_id, car_id, action, occurred_at, session_id \
             FROM recommendation_history \
             WHERE user_id = $1 AND occurred_at >= $2 AND action = ANY($3) \
             ORDER BY occurred_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(since)
        .bind(actions)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Interaction::try_from).collect()
    }

    async fn car_ids_with_action(
        &self,
        user_id: UserId,
        action: InteractionAction,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<HashSet<CarId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT car_id FROM recommendation_history \
             WHERE user_id = $1 AND action = $2 \
             AND ($3::TIMESTAMPTZ IS NULL OR occurred_at >= $3)",
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM recommendation_history WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(action: &str) -> InteractionRow {
        InteractionRow {
            id: 11,
            user_id: 1,
            car_id: 42,
            action: action.to_string(),
            occurred_at: Utc::now(),
            session_id: Some("s-1".to_string()),
        }
    }

    #[test]
    fn test_row_conversion() {
        let interaction = Interaction::try_from(row("dismiss")).unwrap();
        assert_eq!(interaction.action, InteractionAction::Dismiss);
        assert_eq!(interaction.car_id, 42);
        assert_eq!(interaction.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_row_with_unknown_action_is_internal_error() {
        let err = Interaction::try_from(row("purchase")).unwrap_err();
        assert!(matches!(err, AppError::Internal(msg) if msg.contains("interaction 11")));
    }
}
