use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::evaluations::models::{CreateEvaluation, Evaluation, EvaluationStatus};

/// Persistence for evaluations.
///
/// Implementations return fully hydrated rows; nothing is loaded lazily.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    /// Insert a new evaluation in `created` status
    async fn insert(&self, requester_id: i64, data: &CreateEvaluation) -> Result<Evaluation>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Evaluation>>;

    /// Newest first, optionally restricted to one status
    async fn list(
        &self,
        status: Option<EvaluationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Evaluation>>;

    async fn count(&self, status: Option<EvaluationStatus>) -> Result<i64>;

    /// Write the mutable fields of `evaluation` if the stored version still equals
    /// `evaluation.version`. Returns `None` when another writer got there first.
    async fn update(&self, evaluation: &Evaluation) -> Result<Option<Evaluation>>;
}

pub struct PgEvaluationRepository {
    pool: PgPool,
}

impl PgEvaluationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationRepository for PgEvaluationRepository {
    async fn insert(&self, requester_id: i64, data: &CreateEvaluation) -> Result<Evaluation> {
        let evaluation = sqlx::query_as::<_, Evaluation>(
            r#"
            INSERT INTO evaluations
                (requester_id, city_id, vehicle_make, vehicle_model, vehicle_year, vehicle_plate, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(requester_id)
        .bind(data.city_id)
        .bind(&data.vehicle_make)
        .bind(&data.vehicle_model)
        .bind(data.vehicle_year)
        .bind(&data.vehicle_plate)
        .bind(&data.notes)
        .bind(EvaluationStatus::Created)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create evaluation: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(evaluation)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Evaluation>> {
        let evaluation =
            sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(evaluation)
    }

    async fn list(
        &self,
        status: Option<EvaluationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Evaluation>> {
        let evaluations = sqlx::query_as::<_, Evaluation>(
            r#"
            SELECT * FROM evaluations
            WHERE ($1::evaluation_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(evaluations)
    }

    async fn count(&self, status: Option<EvaluationStatus>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM evaluations WHERE ($1::evaluation_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn update(&self, evaluation: &Evaluation) -> Result<Option<Evaluation>> {
        let updated = sqlx::query_as::<_, Evaluation>(
            r#"
            UPDATE evaluations
            SET evaluator_id = $3, status = $4, notes = $5,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(evaluation.id)
        .bind(evaluation.version)
        .bind(evaluation.evaluator_id)
        .bind(evaluation.status)
        .bind(&evaluation.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update evaluation {}: {:?}", evaluation.id, e);
            AppError::Database(e)
        })?;

        Ok(updated)
    }
}
