//! # Audit Log
//!
//! Every state transition and money movement is audit-logged. The sink
//! is a trait so deployments can ship entries to a database table or an
//! external collector; the default sink writes structured tracing
//! events.
//!
//! Audit failures never fail the business operation that produced the
//! entry. They are reported at `error!` and the operation proceeds.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

/// One auditable event.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Verb, e.g. "session.close", "payment.cash", "transaction.void".
    pub action: String,
    /// Entity kind: "session", "transaction", "payment".
    pub entity_type: String,
    pub entity_id: String,
    /// User who performed the action.
    pub actor: String,
    pub tenant_id: String,
    /// Action-specific context (amounts, before/after status).
    pub metadata: Value,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
        tenant_id: impl Into<String>,
        metadata: Value,
    ) -> Self {
        AuditEntry {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            tenant_id: tenant_id.into(),
            metadata,
        }
    }
}

/// Audit sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn log(&self, entry: AuditEntry) -> Result<(), String>;
}

/// Records the entry, swallowing (but reporting) sink failures.
pub async fn record(audit: &dyn AuditLog, entry: AuditEntry) {
    let action = entry.action.clone();
    let entity_id = entry.entity_id.clone();
    if let Err(reason) = audit.log(entry).await {
        error!(action = %action, entity_id = %entity_id, reason = %reason, "Audit sink failed");
    }
}

/// Default sink: structured tracing events.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn log(&self, entry: AuditEntry) -> Result<(), String> {
        info!(
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            actor = %entry.actor,
            tenant_id = %entry.tenant_id,
            metadata = %entry.metadata,
            "audit"
        );
        Ok(())
    }
}
