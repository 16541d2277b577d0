//! Content report repository

use crate::models::{ListParams, Report, ReportStatus, ReportTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Report repository trait
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, report: &Report) -> Result<Report>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Report>>;

    /// Whether the reporter already has a pending report on the target
    async fn has_pending(&self, reporter_id: i64, target: ReportTarget) -> Result<bool>;

    /// List reports, newest first, optionally filtered by status
    async fn list(&self, status: Option<ReportStatus>, params: &ListParams) -> Result<(Vec<Report>, i64)>;

    /// Move a pending report to `status`. Returns false if it was no longer pending.
    async fn resolve(
        &self,
        id: i64,
        status: ReportStatus,
        moderator_id: i64,
        note: Option<&str>,
    ) -> Result<bool>;
}

pub struct SqlxReportRepository {
    pool: SqlitePool,
}

impl SqlxReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ReportRepository> {
        Arc::new(Self::new(pool))
    }
}

const REPORT_COLUMNS: &str = "id, reporter_id, post_id, comment_id, reason, status, resolved_by, \
     resolution_note, created_at, resolved_at";

#[async_trait]
impl ReportRepository for SqlxReportRepository {
    async fn create(&self, report: &Report) -> Result<Report> {
        let result = sqlx::query(
            r#"
            INSERT INTO reports (reporter_id, post_id, comment_id, reason, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.reporter_id)
        .bind(report.post_id)
        .bind(report.comment_id)
        .bind(&report.reason)
        .bind(report.status.to_string())
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create report")?;

        let mut created = report.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get report by ID")?;

        row.as_ref().map(row_to_report).transpose()
    }

    async fn has_pending(&self, reporter_id: i64, target: ReportTarget) -> Result<bool> {
        let (column, target_id) = match target {
            ReportTarget::Post(id) => ("post_id", id),
            ReportTarget::Comment(id) => ("comment_id", id),
        };
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) as count FROM reports WHERE reporter_id = ? AND {} = ? AND status = 'pending'",
            column
        ))
        .bind(reporter_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check pending reports")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn list(&self, status: Option<ReportStatus>, params: &ListParams) -> Result<(Vec<Report>, i64)> {
        let status = status.map(|s| s.to_string());

        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports WHERE (? IS NULL OR status = ?) ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            REPORT_COLUMNS
        ))
        .bind(&status)
        .bind(&status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list reports")?;

        let count_row = sqlx::query("SELECT COUNT(*) as count FROM reports WHERE (? IS NULL OR status = ?)")
            .bind(&status)
            .bind(&status)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count reports")?;

        let reports = rows.iter().map(row_to_report).collect::<Result<Vec<_>>>()?;
        Ok((reports, count_row.get("count")))
    }

    async fn resolve(
        &self,
        id: i64,
        status: ReportStatus,
        moderator_id: i64,
        note: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?, resolved_by = ?, resolution_note = ?, resolved_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.to_string())
        .bind(moderator_id)
        .bind(note)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to resolve report")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_report(row: &SqliteRow) -> Result<Report> {
    let status_str: String = row.get("status");
    let status = ReportStatus::from_str(&status_str)
        .with_context(|| format!("Invalid report status in database: {}", status_str))?;

    Ok(Report {
        id: row.get("id"),
        reporter_id: row.get("reporter_id"),
        post_id: row.get("post_id"),
        comment_id: row.get("comment_id"),
        reason: row.get("reason"),
        status,
        resolved_by: row.get("resolved_by"),
        resolution_note: row.get("resolution_note"),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    })
}
