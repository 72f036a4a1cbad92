// Find-or-create of practitioner and facility records keyed by the
// identity provider subject.

use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::IdentityClaims;
use crate::database::{Lookup, Record, Repository, StoreError};
use crate::error::ApiError;
use crate::types::Scope;

/// Records that are provisioned from identity claims on first sight
pub trait Onboardable: Record<Id = i64> {
    /// Role a caller must hold to be onboarded as this kind
    const ROLE: &'static str;

    fn draft_from_claims(claims: &IdentityClaims) -> Self::Draft;
}

pub struct IdentityResolver<R: Onboardable> {
    repo: Arc<dyn Repository<R>>,
}

impl<R: Onboardable> IdentityResolver<R> {
    pub fn new(repo: Arc<dyn Repository<R>>) -> Self {
        Self { repo }
    }

    /// Local id for the caller, creating the record on first sight.
    /// A soft-deleted record bars the identity for good.
    pub async fn resolve(&self, claims: &IdentityClaims) -> Result<i64, ApiError> {
        if let Some(id) = self.lookup(claims).await? {
            return Ok(id);
        }

        match self.repo.insert(R::draft_from_claims(claims)).await {
            Ok(created) => {
                info!("Provisioned {} {} for subject '{}'", R::KIND, created.id(), claims.subject);
                Ok(*created.id())
            }
            Err(StoreError::Duplicate { .. }) => {
                // Lost the insert race: the winner's row is there now
                self.lookup(claims).await?.ok_or_else(|| {
                    ApiError::unexpected(format!("Could not resolve {} for the current identity", R::KIND))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup(&self, claims: &IdentityClaims) -> Result<Option<i64>, ApiError> {
        let filter = [Lookup::eq("external_identity", claims.subject.as_str())];
        let existing = self.repo.find(&filter, Scope::Any).await?;

        if let Some(active) = existing.iter().find(|r| r.lifecycle().is_active()) {
            return Ok(Some(*active.id()));
        }
        if let Some(revoked) = existing.first() {
            warn!(
                "Rejected revoked identity '{}' ({} {} deleted)",
                claims.subject,
                R::KIND,
                revoked.id()
            );
            return Err(ApiError::forbidden(format!(
                "Identity revoked: the {} for this account was deleted",
                R::KIND
            )));
        }
        Ok(None)
    }
}

/// Local id of the calling practitioner or facility, placed in request
/// extensions by the identity middleware
#[derive(Debug)]
pub struct ResolvedIdentity<R> {
    pub id: i64,
    kind: PhantomData<fn() -> R>,
}

impl<R> ResolvedIdentity<R> {
    pub fn new(id: i64) -> Self {
        Self { id, kind: PhantomData }
    }
}

impl<R> Clone for ResolvedIdentity<R> {
    fn clone(&self) -> Self {
        Self::new(self.id)
    }
}

impl<R> Copy for ResolvedIdentity<R> {}
