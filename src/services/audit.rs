//! Audit trail service

use crate::db::repositories::AuditLogRepository;
use crate::models::{AuditLog, ListParams, NewAuditLog, PagedResult};
use crate::services::error::ServiceResult;
use anyhow::Context;
use std::sync::Arc;

pub struct AuditService {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Append an entry to the audit trail
    pub async fn record(&self, entry: NewAuditLog) -> ServiceResult<AuditLog> {
        let log = self.repo.create(&entry).await.context("Failed to write audit log")?;
        tracing::info!(
            action = entry.action,
            actor = %entry.actor_type,
            actor_id = entry.actor_id,
            target_id = entry.target_id,
            "audit"
        );
        Ok(log)
    }

    pub async fn list(&self, action: Option<&str>, params: ListParams) -> ServiceResult<PagedResult<AuditLog>> {
        let action = action.map(str::trim).filter(|a| !a.is_empty());
        let (items, total) = self.repo.list(action, &params).await?;
        Ok(PagedResult::new(items, total, &params))
    }
}
