//! Persistence collaborator interface.
//!
//! Each mutation loads the full aggregate, applies one transition and saves
//! the whole document back. Conflict detection is document-level optimistic
//! concurrency on the aggregate `rev`; retrying is the caller's policy.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::domain::tender::Tender;
use crate::error::TenderError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tender {0} not found")]
    NotFound(String),

    #[error("revision conflict on tender {id}: expected {expected}, got {actual}")]
    Conflict { id: String, expected: u64, actual: u64 },
}

impl From<StoreError> for TenderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => TenderError::not_found("tender_id"),
            StoreError::Conflict { .. } => TenderError::Conflict(e.to_string()),
        }
    }
}

pub trait TenderStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Tender, StoreError>;

    /// Persist the aggregate. Fails with `Conflict` when the stored revision
    /// has moved past the one the aggregate was loaded at.
    fn save(&self, tender: &Tender) -> Result<(), StoreError>;
}

/// Shared handles keep working as stores, so a test or embedder can keep one
/// side and hand the other to the service.
impl<S: TenderStore + ?Sized> TenderStore for std::sync::Arc<S> {
    fn load(&self, id: &str) -> Result<Tender, StoreError> {
        (**self).load(id)
    }

    fn save(&self, tender: &Tender) -> Result<(), StoreError> {
        (**self).save(tender)
    }
}

/// Process-local store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<HashMap<String, Tender>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenderStore for InMemoryStore {
    fn load(&self, id: &str) -> Result<Tender, StoreError> {
        self.inner
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save(&self, tender: &Tender) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if let Some(stored) = inner.get(&tender.id) {
            if stored.rev != tender.rev {
                return Err(StoreError::Conflict {
                    id: tender.id.clone(),
                    expected: stored.rev,
                    actual: tender.rev,
                });
            }
        }
        let mut next = tender.clone();
        next.rev += 1;
        inner.insert(next.id.clone(), next);
        Ok(())
    }
}
