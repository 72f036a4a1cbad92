use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Lifecycle, Scope};

/// Errors raised by repositories
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate {kind} (constraint {constraint})")]
    Duplicate { kind: &'static str, constraint: String },

    #[error("Unknown lookup field '{field}' for {kind}")]
    UnknownField { kind: &'static str, field: &'static str },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A value a lookup compares a reference column against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Uuid(Uuid),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

/// Equality condition on one whitelisted column; several lookups are AND-ed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub field: &'static str,
    pub value: FieldValue,
}

impl Lookup {
    pub fn eq(field: &'static str, value: impl Into<FieldValue>) -> Self {
        Self { field, value: value.into() }
    }
}

/// A uniqueness rule as the database would enforce it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub constraint: &'static str,
    pub value: String,
    /// Partial index over active rows only
    pub active_only: bool,
}

/// Identifier types the repositories know how to allocate
pub trait RecordId: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {
    fn allocate(sequence: i64) -> Self;
    fn to_field_value(&self) -> FieldValue;
}

impl RecordId for i64 {
    fn allocate(sequence: i64) -> Self {
        sequence
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Int(*self)
    }
}

impl RecordId for Uuid {
    fn allocate(_sequence: i64) -> Self {
        Uuid::new_v4()
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Uuid(*self)
    }
}

/// Anything stored in a repository
pub trait Record: Clone + Send + Sync + 'static {
    type Id: RecordId;
    type Draft: Clone + Send + Sync + 'static;

    /// Human readable kind, used in error messages
    const KIND: &'static str;

    /// Columns callers may filter on
    const LOOKUP_FIELDS: &'static [&'static str];

    fn id(&self) -> &Self::Id;
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Builds the stored record from a draft once storage has assigned identity
    fn from_draft(id: Self::Id, draft: Self::Draft, created_at: DateTime<Utc>) -> Self;

    /// Value of a lookup column; `None` for columns outside `LOOKUP_FIELDS`
    fn field(&self, name: &str) -> Option<FieldValue>;

    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

/// Persistent collection of one record kind
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    async fn insert(&self, draft: R::Draft) -> StoreResult<R>;

    async fn get(&self, id: &R::Id, scope: Scope) -> StoreResult<Option<R>>;

    /// Records matching every lookup, oldest first
    async fn find(&self, filter: &[Lookup], scope: Scope) -> StoreResult<Vec<R>>;

    /// Replaces the mutable fields of an active record. False if no active record matched.
    async fn update(&self, record: &R) -> StoreResult<bool>;

    /// Sets the delete timestamp of an active record. False if no active record matched.
    async fn soft_delete(&self, id: &R::Id, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn list(&self, scope: Scope) -> StoreResult<Vec<R>> {
        self.find(&[], scope).await
    }

    async fn find_one(&self, filter: &[Lookup], scope: Scope) -> StoreResult<Option<R>> {
        Ok(self.find(filter, scope).await?.into_iter().next())
    }

    async fn exists(&self, id: &R::Id) -> StoreResult<bool> {
        Ok(self.get(id, Scope::Active).await?.is_some())
    }

    /// Active record or `StoreError::NotFound`
    async fn get_404(&self, id: &R::Id) -> StoreResult<R> {
        self.get(id, Scope::Active)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("No active {} found with Id: {}", R::KIND, id)))
    }
}
