//! Append-only audit sink for credit-affecting events.
//!
//! Appends are best effort. The balance change is the source of truth: a
//! failed append is reported by the ledger but never undoes the mutation
//! that produced it.

use std::sync::Arc;

use async_trait::async_trait;

use pagecredits_core::CreditHistoryEntry;
use pagecredits_store::{CreditStore, StoreError};

/// Write-only sink for history entries.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry could not be persisted.
    async fn append(&self, entry: &CreditHistoryEntry) -> Result<(), StoreError>;
}

/// Audit log that writes into the credit store's history table.
#[derive(Clone)]
pub struct StoreAuditLog {
    store: Arc<dyn CreditStore>,
}

impl StoreAuditLog {
    /// Write through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditLog for StoreAuditLog {
    async fn append(&self, entry: &CreditHistoryEntry) -> Result<(), StoreError> {
        self.store.append_history(entry).await
    }
}
