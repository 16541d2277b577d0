//! Audit log repository
//!
//! Append-only: there is no update or delete operation.

use crate::models::{ActorType, AuditLog, ListParams, NewAuditLog};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog>;

    /// List entries, newest first, optionally filtered by exact action name
    async fn list(&self, action: Option<&str>, params: &ListParams) -> Result<(Vec<AuditLog>, i64)>;
}

pub struct SqlxAuditLogRepository {
    pool: SqlitePool,
}

impl SqlxAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn AuditLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuditLogRepository for SqlxAuditLogRepository {
    async fn create(&self, entry: &NewAuditLog) -> Result<AuditLog> {
        let created_at = Utc::now();
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize audit details")?;

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_type, actor_id, action, target_type, target_id, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.actor_type.to_string())
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(details)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("Failed to write audit log")?;

        Ok(AuditLog {
            id: result.last_insert_rowid(),
            actor_type: entry.actor_type,
            actor_id: entry.actor_id,
            action: entry.action.to_string(),
            target_type: entry.target_type.to_string(),
            target_id: entry.target_id,
            details: entry.details.clone(),
            created_at,
        })
    }

    async fn list(&self, action: Option<&str>, params: &ListParams) -> Result<(Vec<AuditLog>, i64)> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor_type, actor_id, action, target_type, target_id, details, created_at
            FROM audit_logs
            WHERE (? IS NULL OR action = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(action)
        .bind(action)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list audit logs")?;

        let count_row = sqlx::query("SELECT COUNT(*) as count FROM audit_logs WHERE (? IS NULL OR action = ?)")
            .bind(action)
            .bind(action)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count audit logs")?;

        let entries = rows.iter().map(row_to_audit_log).collect::<Result<Vec<_>>>()?;
        Ok((entries, count_row.get("count")))
    }
}

fn row_to_audit_log(row: &SqliteRow) -> Result<AuditLog> {
    let actor_type: String = row.get("actor_type");
    let details: Option<String> = row.get("details");

    Ok(AuditLog {
        id: row.get("id"),
        actor_type: ActorType::from_str(&actor_type)
            .with_context(|| format!("Invalid actor type in database: {}", actor_type))?,
        actor_id: row.get("actor_id"),
        action: row.get("action"),
        target_type: row.get("target_type"),
        target_id: row.get("target_id"),
        details: details
            .map(|d| serde_json::from_str(&d))
            .transpose()
            .context("Invalid audit details in database")?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::migrated_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_and_filter_audit_logs() {
        let repo = SqlxAuditLogRepository::new(migrated_pool().await);

        repo.create(
            &NewAuditLog::new(ActorType::Member, 1, "comment.update", "comment", 7)
                .with_details(json!({"before": "a", "after": "b"})),
        )
        .await
        .unwrap();
        repo.create(&NewAuditLog::new(ActorType::Moderator, 2, "ban.create", "member", 3))
            .await
            .unwrap();

        let (all, total) = repo.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].action, "ban.create");

        let (updates, total) = repo.list(Some("comment.update"), &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(updates[0].actor_type, ActorType::Member);
        assert_eq!(updates[0].details.as_ref().unwrap()["after"], "b");
    }
}
