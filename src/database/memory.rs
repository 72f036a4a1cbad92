use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::database::repository::{Lookup, Record, RecordId, Repository, StoreError, StoreResult};
use crate::types::Scope;

/// In-process repository used by tests and `serve --in-memory`.
///
/// Enforces the same unique keys as the SQL schema and keeps insertion
/// order, so "oldest first" holds without looking at timestamps.
pub struct MemoryRepository<R: Record> {
    rows: RwLock<Vec<R>>,
    sequence: AtomicI64,
    calls: AtomicUsize,
}

impl<R: Record> MemoryRepository<R> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            sequence: AtomicI64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of repository operations served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored rows regardless of lifecycle
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn matches(record: &R, filter: &[Lookup]) -> StoreResult<bool> {
        for lookup in filter {
            if !R::LOOKUP_FIELDS.contains(&lookup.field) {
                return Err(StoreError::UnknownField { kind: R::KIND, field: lookup.field });
            }
            if record.field(lookup.field).as_ref() != Some(&lookup.value) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_unique(rows: &[R], candidate: &R) -> StoreResult<()> {
        for key in candidate.unique_keys() {
            let clash = rows.iter().filter(|row| row.id() != candidate.id()).any(|row| {
                (!key.active_only || row.lifecycle().is_active())
                    && row.unique_keys().iter().any(|other| other.constraint == key.constraint && other.value == key.value)
            });
            if clash {
                return Err(StoreError::Duplicate { kind: R::KIND, constraint: key.constraint.to_string() });
            }
        }
        Ok(())
    }
}

impl<R: Record> Default for MemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> Repository<R> for MemoryRepository<R> {
    async fn insert(&self, draft: R::Draft) -> StoreResult<R> {
        self.touch();
        let mut rows = self.rows.write().await;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = R::from_draft(R::Id::allocate(sequence), draft, Utc::now());
        Self::check_unique(&rows, &record)?;
        rows.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &R::Id, scope: Scope) -> StoreResult<Option<R>> {
        self.touch();
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id() == id && scope.admits(row.lifecycle())).cloned())
    }

    async fn find(&self, filter: &[Lookup], scope: Scope) -> StoreResult<Vec<R>> {
        self.touch();
        let rows = self.rows.read().await;
        let mut found = Vec::new();
        for row in rows.iter().filter(|row| scope.admits(row.lifecycle())) {
            if Self::matches(row, filter)? {
                found.push(row.clone());
            }
        }
        Ok(found)
    }

    async fn update(&self, record: &R) -> StoreResult<bool> {
        self.touch();
        let mut rows = self.rows.write().await;
        Self::check_unique(&rows, record)?;
        match rows.iter_mut().find(|row| row.id() == record.id() && row.lifecycle().is_active()) {
            Some(row) => {
                // Lifecycle is owned by the store, never by the caller's copy
                let lifecycle = *row.lifecycle();
                let mut replacement = record.clone();
                *replacement.lifecycle_mut() = lifecycle;
                *row = replacement;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete(&self, id: &R::Id, at: DateTime<Utc>) -> StoreResult<bool> {
        self.touch();
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|row| row.id() == id) {
            Some(row) => Ok(row.lifecycle_mut().terminate(at)),
            None => Ok(false),
        }
    }
}
