use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{IdentityClaims, ROLE_PRACTITIONER};
use crate::database::models::{NewPractitioner, Practitioner};
use crate::database::Repository;
use crate::error::ApiError;
use crate::services::identity::Onboardable;
use crate::siblings::PractitionerSummary;
use crate::types::Scope;
use crate::validation::{FieldErrors, Validate};

impl Onboardable for Practitioner {
    const ROLE: &'static str = ROLE_PRACTITIONER;

    fn draft_from_claims(claims: &IdentityClaims) -> NewPractitioner {
        NewPractitioner {
            external_identity: claims.subject.clone(),
            license_number: String::new(),
            first_name: claims.given_name.clone(),
            last_name: claims.family_name.clone(),
            email: claims.email.clone(),
            phone_number: claims.phone_number.clone().unwrap_or_default(),
            specialty: String::new(),
        }
    }
}

/// Full replacement of the caller's profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PractitionerUpdate {
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub specialty: String,
}

impl Validate for PractitionerUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors
            .not_blank("first_name", &self.first_name)
            .not_blank("last_name", &self.last_name)
            .email("email", &self.email)
            .phone("phone_number", &self.phone_number);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PractitionerPatch {
    pub license_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub specialty: Option<String>,
}

impl Validate for PractitionerPatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(v) = &self.first_name {
            errors.not_blank("first_name", v);
        }
        if let Some(v) = &self.last_name {
            errors.not_blank("last_name", v);
        }
        if let Some(v) = &self.email {
            errors.email("email", v);
        }
        if let Some(v) = &self.phone_number {
            errors.phone("phone_number", v);
        }
        errors.finish()
    }
}

pub struct PractitionerService {
    repo: Arc<dyn Repository<Practitioner>>,
}

impl PractitionerService {
    pub fn new(repo: Arc<dyn Repository<Practitioner>>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> Arc<dyn Repository<Practitioner>> {
        self.repo.clone()
    }

    pub async fn get(&self, id: i64) -> Result<Practitioner, ApiError> {
        Ok(self.repo.get_404(&id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Practitioner>, ApiError> {
        Ok(self.repo.list(Scope::Active).await?)
    }

    /// Summary for sibling services; `None` when not active
    pub async fn summary(&self, id: i64) -> Result<Option<PractitionerSummary>, ApiError> {
        let practitioner = self.repo.get(&id, Scope::Active).await?;
        Ok(practitioner.as_ref().map(PractitionerSummary::from))
    }

    pub async fn replace(&self, id: i64, update: PractitionerUpdate) -> Result<Practitioner, ApiError> {
        update.validate()?;
        let mut practitioner = self.repo.get_404(&id).await?;
        practitioner.license_number = update.license_number;
        practitioner.first_name = update.first_name;
        practitioner.last_name = update.last_name;
        practitioner.email = update.email;
        practitioner.phone_number = update.phone_number;
        practitioner.specialty = update.specialty;
        self.store(practitioner).await
    }

    pub async fn patch(&self, id: i64, patch: PractitionerPatch) -> Result<Practitioner, ApiError> {
        patch.validate()?;
        let mut practitioner = self.repo.get_404(&id).await?;
        if let Some(v) = patch.license_number {
            practitioner.license_number = v;
        }
        if let Some(v) = patch.first_name {
            practitioner.first_name = v;
        }
        if let Some(v) = patch.last_name {
            practitioner.last_name = v;
        }
        if let Some(v) = patch.email {
            practitioner.email = v;
        }
        if let Some(v) = patch.phone_number {
            practitioner.phone_number = v;
        }
        if let Some(v) = patch.specialty {
            practitioner.specialty = v;
        }
        self.store(practitioner).await
    }

    /// Soft delete; the external identity can never be provisioned again
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.soft_delete(&id, Utc::now()).await? {
            return Err(ApiError::not_found(format!("No active practitioner found with Id: {}", id)));
        }
        info!("Practitioner {} deleted, identity revoked", id);
        Ok(())
    }

    async fn store(&self, practitioner: Practitioner) -> Result<Practitioner, ApiError> {
        if !self.repo.update(&practitioner).await? {
            return Err(ApiError::not_found(format!(
                "No active practitioner found with Id: {}",
                practitioner.id
            )));
        }
        Ok(practitioner)
    }
}
