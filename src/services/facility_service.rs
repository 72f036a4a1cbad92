use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{IdentityClaims, ROLE_FACILITY};
use crate::database::models::{Facility, FacilityLink, NewFacility, NewFacilityLink};
use crate::database::{Lookup, Repository, StoreError};
use crate::error::ApiError;
use crate::services::identity::Onboardable;
use crate::siblings::{PractitionerLookup, PractitionerSummary};
use crate::types::Scope;
use crate::validation::{FieldErrors, Validate};

impl Onboardable for Facility {
    const ROLE: &'static str = ROLE_FACILITY;

    fn draft_from_claims(claims: &IdentityClaims) -> NewFacility {
        let name = format!("{} {}", claims.given_name, claims.family_name);
        NewFacility {
            external_identity: claims.subject.clone(),
            name: name.trim().to_string(),
            address: String::new(),
            email: claims.email.clone(),
            phone_number: claims.phone_number.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacilityUpdate {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
}

impl Validate for FacilityUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors
            .not_blank("name", &self.name)
            .email("email", &self.email)
            .phone("phone_number", &self.phone_number);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Validate for FacilityPatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(v) = &self.name {
            errors.not_blank("name", v);
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

pub struct FacilityService {
    facilities: Arc<dyn Repository<Facility>>,
    links: Arc<dyn Repository<FacilityLink>>,
    practitioners: Arc<dyn PractitionerLookup>,
}

impl FacilityService {
    pub fn new(
        facilities: Arc<dyn Repository<Facility>>,
        links: Arc<dyn Repository<FacilityLink>>,
        practitioners: Arc<dyn PractitionerLookup>,
    ) -> Self {
        Self {
            facilities,
            links,
            practitioners,
        }
    }

    pub fn repository(&self) -> Arc<dyn Repository<Facility>> {
        self.facilities.clone()
    }

    pub async fn get(&self, id: i64) -> Result<Facility, ApiError> {
        Ok(self.facilities.get_404(&id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Facility>, ApiError> {
        Ok(self.facilities.list(Scope::Active).await?)
    }

    pub async fn replace(&self, id: i64, update: FacilityUpdate) -> Result<Facility, ApiError> {
        update.validate()?;
        let mut facility = self.facilities.get_404(&id).await?;
        facility.name = update.name;
        facility.address = update.address;
        facility.email = update.email;
        facility.phone_number = update.phone_number;
        self.store(facility).await
    }

    pub async fn patch(&self, id: i64, patch: FacilityPatch) -> Result<Facility, ApiError> {
        patch.validate()?;
        let mut facility = self.facilities.get_404(&id).await?;
        if let Some(v) = patch.name {
            facility.name = v;
        }
        if let Some(v) = patch.address {
            facility.address = v;
        }
        if let Some(v) = patch.email {
            facility.email = v;
        }
        if let Some(v) = patch.phone_number {
            facility.phone_number = v;
        }
        self.store(facility).await
    }

    /// Soft delete; the external identity can never be provisioned again
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        if !self.facilities.soft_delete(&id, Utc::now()).await? {
            return Err(ApiError::not_found(format!("No active hospital found with Id: {}", id)));
        }
        info!("Facility {} deleted, identity revoked", id);
        Ok(())
    }

    async fn store(&self, facility: Facility) -> Result<Facility, ApiError> {
        if !self.facilities.update(&facility).await? {
            return Err(ApiError::not_found(format!("No active hospital found with Id: {}", facility.id)));
        }
        Ok(facility)
    }

    pub async fn association_exists(&self, practitioner_id: i64, facility_id: i64) -> Result<bool, ApiError> {
        Ok(self.active_link(practitioner_id, facility_id).await?.is_some())
    }

    /// Links a practitioner known to the practitioner service
    pub async fn link(&self, facility_id: i64, practitioner_id: i64) -> Result<FacilityLink, ApiError> {
        if self.practitioners.get_practitioner(practitioner_id).await?.is_none() {
            return Err(ApiError::not_found(format!(
                "No active doctor found with Doctor Id: {}",
                practitioner_id
            )));
        }

        let draft = NewFacilityLink {
            facility_id,
            practitioner_id,
        };
        match self.links.insert(draft).await {
            Ok(link) => {
                info!("Linked practitioner {} to facility {}", practitioner_id, facility_id);
                Ok(link)
            }
            Err(StoreError::Duplicate { .. }) => Err(ApiError::duplicate(format!(
                "Doctor Id: {} is already associated with Hospital Id: {}",
                practitioner_id, facility_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unlink(&self, facility_id: i64, practitioner_id: i64) -> Result<(), ApiError> {
        let link = self
            .active_link(practitioner_id, facility_id)
            .await?
            .ok_or_else(|| no_association(practitioner_id, facility_id))?;

        if !self.links.soft_delete(&link.id, Utc::now()).await? {
            return Err(no_association(practitioner_id, facility_id));
        }
        Ok(())
    }

    /// Practitioners linked to the facility. Lookups that fail are logged
    /// and left out instead of failing the listing.
    pub async fn practitioners_of(&self, facility_id: i64) -> Result<Vec<PractitionerSummary>, ApiError> {
        let links = self
            .links
            .find(&[Lookup::eq("facility_id", facility_id)], Scope::Active)
            .await?;

        let lookups = links
            .iter()
            .map(|link| self.practitioners.get_practitioner(link.practitioner_id));
        let answers = join_all(lookups).await;

        let mut practitioners = Vec::with_capacity(answers.len());
        for (link, answer) in links.iter().zip(answers) {
            match answer {
                Ok(Some(summary)) => practitioners.push(summary),
                Ok(None) => warn!(
                    "Facility {} links practitioner {} which is no longer active",
                    facility_id, link.practitioner_id
                ),
                Err(e) => warn!(
                    "Dropping practitioner {} from facility {} listing: {}",
                    link.practitioner_id, facility_id, e
                ),
            }
        }
        Ok(practitioners)
    }

    async fn active_link(&self, practitioner_id: i64, facility_id: i64) -> Result<Option<FacilityLink>, ApiError> {
        let filter = [
            Lookup::eq("facility_id", facility_id),
            Lookup::eq("practitioner_id", practitioner_id),
        ];
        Ok(self.links.find_one(&filter, Scope::Active).await?)
    }
}

fn no_association(practitioner_id: i64, facility_id: i64) -> ApiError {
    ApiError::not_found(format!(
        "No active association found with Doctor Id: {} and Hospital Id: {}",
        practitioner_id, facility_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;
    use crate::siblings::SiblingError;
    use async_trait::async_trait;

    /// Knows practitioners 1 and 2; practitioner 3 makes the lookup fail
    struct StubLookup;

    #[async_trait]
    impl PractitionerLookup for StubLookup {
        async fn get_practitioner(&self, id: i64) -> Result<Option<PractitionerSummary>, SiblingError> {
            match id {
                1 | 2 => Ok(Some(PractitionerSummary {
                    id,
                    license_number: format!("LIC-{}", id),
                    first_name: "Ada".to_string(),
                    last_name: "Byron".to_string(),
                    email: "ada@example.com".to_string(),
                    specialty: String::new(),
                })),
                3 => Err(SiblingError::Timeout("practitioner service did not answer".to_string())),
                _ => Ok(None),
            }
        }
    }

    fn service() -> (FacilityService, Arc<MemoryRepository<FacilityLink>>) {
        let links = Arc::new(MemoryRepository::<FacilityLink>::new());
        let service = FacilityService::new(
            Arc::new(MemoryRepository::<Facility>::new()),
            links.clone(),
            Arc::new(StubLookup),
        );
        (service, links)
    }

    #[tokio::test]
    async fn linking_requires_a_known_practitioner() {
        let (service, _) = service();
        assert_eq!(service.link(10, 99).await.unwrap_err().status_code(), 404);
        service.link(10, 1).await.unwrap();
        assert!(service.association_exists(1, 10).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_active_link_is_a_conflict() {
        let (service, _) = service();
        service.link(10, 1).await.unwrap();
        assert_eq!(service.link(10, 1).await.unwrap_err().status_code(), 409);

        service.unlink(10, 1).await.unwrap();
        assert!(!service.association_exists(1, 10).await.unwrap());
        assert_eq!(service.unlink(10, 1).await.unwrap_err().status_code(), 404);
        service.link(10, 1).await.unwrap();
    }

    #[tokio::test]
    async fn listing_drops_failed_lookups() {
        let (service, links) = service();
        service.link(10, 1).await.unwrap();
        service.link(10, 2).await.unwrap();
        // Practitioner 3 cannot be looked up at link time either, so seed directly
        links
            .insert(NewFacilityLink {
                facility_id: 10,
                practitioner_id: 3,
            })
            .await
            .unwrap();

        let listed = service.practitioners_of(10).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
