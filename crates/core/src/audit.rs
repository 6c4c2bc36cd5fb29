//! Audit trail for journal mutations.
//!
//! Audit writes are fire-and-forget: they run after the mutating write has
//! committed, and a failing sink never fails the mutation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::time::Clock;
use folio_shared::types::AuditLogId;

/// What happened to the audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// Entity created.
    Create,
    /// Entity changed.
    Update,
    /// Entity soft-deleted.
    Delete,
}

impl AuditAction {
    /// Returns the uppercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unknown audit action: {s}")),
        }
    }
}

/// A persisted audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique identifier.
    pub id: AuditLogId,
    /// Kind of entity, e.g. `"journal"`.
    pub entity_type: String,
    /// Id of the audited entity.
    pub entity_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Before/after snapshot.
    pub changes: serde_json::Value,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

/// An audit event before it is stamped and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Kind of entity.
    pub entity_type: &'static str,
    /// Id of the audited entity.
    pub entity_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Before/after snapshot.
    pub changes: serde_json::Value,
}

impl AuditEntry {
    /// Creates a journal audit entry.
    #[must_use]
    pub fn journal(entity_id: Uuid, action: AuditAction, changes: serde_json::Value) -> Self {
        Self {
            entity_type: "journal",
            entity_id,
            action,
            changes,
        }
    }

    /// Creates an account audit entry.
    #[must_use]
    pub fn account(entity_id: Uuid, action: AuditAction, changes: serde_json::Value) -> Self {
        Self {
            entity_type: "account",
            entity_id,
            action,
            changes,
        }
    }
}

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an entry. Failures are logged, never returned.
    async fn record(&self, entry: AuditEntry);
}

/// Writes audit entries to the record store.
pub struct StoreAuditSink {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl StoreAuditSink {
    /// Creates a sink backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn record(&self, entry: AuditEntry) {
        let log = AuditLog {
            id: AuditLogId::new(),
            entity_type: entry.entity_type.to_string(),
            entity_id: entry.entity_id,
            action: entry.action,
            changes: entry.changes,
            timestamp: self.clock.now(),
        };
        let batch = WriteBatch::new().with(WriteOp::AppendAudit(log));

        if let Err(e) = self.store.apply(batch).await {
            warn!(
                entity_id = %entry.entity_id,
                action = entry.action.as_str(),
                error = %e,
                "Failed to write audit log"
            );
        }
    }
}

/// Discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: AuditEntry) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockRecordStore, StoreError};
    use crate::time::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::Create.as_str(), "CREATE");
        assert_eq!(AuditAction::from_str("delete"), Ok(AuditAction::Delete));
        assert!(AuditAction::from_str("archive").is_err());
    }

    #[tokio::test]
    async fn test_store_sink_writes_stamped_row() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let sink = StoreAuditSink::new(store.clone(), Arc::new(ManualClock::new(now)));
        let entity_id = Uuid::now_v7();

        sink.record(AuditEntry::journal(entity_id, AuditAction::Create, json!({"after": 1})))
            .await;

        let trail = store.audit_trail(entity_id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Create);
        assert_eq!(trail[0].entity_type, "journal");
        assert_eq!(trail[0].timestamp, now);
        assert_eq!(trail[0].changes, json!({"after": 1}));
    }

    #[tokio::test]
    async fn test_store_sink_swallows_failures() {
        let mut store = MockRecordStore::new();
        store
            .expect_apply()
            .times(1)
            .returning(|_| Err(StoreError::Backend("read-only".to_string())));
        let sink = StoreAuditSink::new(Arc::new(store), Arc::new(ManualClock::new(Utc::now())));

        // Completes without panicking or returning an error.
        sink.record(AuditEntry::journal(Uuid::nil(), AuditAction::Delete, json!(null)))
            .await;
    }
}
