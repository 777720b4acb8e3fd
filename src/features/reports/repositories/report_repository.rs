use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{Report, ReportStatus};

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a draft report. A second report for the same evaluation is a `Conflict`.
    async fn insert(
        &self,
        evaluation_id: i64,
        evaluator_id: i64,
        summary: Option<&str>,
    ) -> Result<Report>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Report>>;

    async fn find_by_evaluation_id(&self, evaluation_id: i64) -> Result<Option<Report>>;

    /// Versioned write of summary and status; `None` if the row changed underneath us
    async fn update(&self, report: &Report) -> Result<Option<Report>>;
}

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn insert(
        &self,
        evaluation_id: i64,
        evaluator_id: i64,
        summary: Option<&str>,
    ) -> Result<Report> {
        sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (evaluation_id, evaluator_id, summary, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(evaluation_id)
        .bind(evaluator_id)
        .bind(summary)
        .bind(ReportStatus::Draft)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                format!("a report already exists for evaluation {}", evaluation_id),
            )
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Report>> {
        let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    async fn find_by_evaluation_id(&self, evaluation_id: i64) -> Result<Option<Report>> {
        let report =
            sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE evaluation_id = $1")
                .bind(evaluation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(report)
    }

    async fn update(&self, report: &Report) -> Result<Option<Report>> {
        let updated = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET summary = $3, status = $4, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(report.id)
        .bind(report.version)
        .bind(&report.summary)
        .bind(report.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update report {}: {:?}", report.id, e);
            AppError::Database(e)
        })?;

        Ok(updated)
    }
}
