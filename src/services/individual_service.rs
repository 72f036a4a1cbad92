use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::database::models::{Individual, NewIndividual};
use crate::database::{Lookup, Repository};
use crate::error::ApiError;
use crate::types::Scope;
use crate::validation::{FieldErrors, Validate};

impl Validate for NewIndividual {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors
            .digits("national_id", &self.national_id)
            .not_blank("first_name", &self.first_name)
            .not_blank("last_name", &self.last_name)
            .not_future("birth_date", self.birth_date)
            .optional_email("email", &self.email)
            .phone("phone_number", &self.phone_number);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndividualPatch {
    pub national_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl Validate for IndividualPatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(v) = &self.national_id {
            errors.digits("national_id", v);
        }
        if let Some(v) = &self.first_name {
            errors.not_blank("first_name", v);
        }
        if let Some(v) = &self.last_name {
            errors.not_blank("last_name", v);
        }
        if let Some(v) = self.birth_date {
            errors.not_future("birth_date", v);
        }
        if let Some(v) = &self.email {
            errors.optional_email("email", v);
        }
        if let Some(v) = &self.phone_number {
            errors.phone("phone_number", v);
        }
        errors.finish()
    }
}

pub struct IndividualService {
    repo: Arc<dyn Repository<Individual>>,
}

impl IndividualService {
    pub fn new(repo: Arc<dyn Repository<Individual>>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> Arc<dyn Repository<Individual>> {
        self.repo.clone()
    }

    pub async fn create(&self, draft: NewIndividual) -> Result<Individual, ApiError> {
        draft.validate()?;
        Ok(self.repo.insert(draft).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Individual, ApiError> {
        Ok(self.repo.get_404(&id).await?)
    }

    pub async fn exists(&self, id: i64) -> Result<bool, ApiError> {
        Ok(self.repo.exists(&id).await?)
    }

    /// Active individuals, optionally narrowed to one national id
    pub async fn list(&self, national_id: Option<&str>) -> Result<Vec<Individual>, ApiError> {
        let filter: Vec<Lookup> = national_id
            .map(|nid| vec![Lookup::eq("national_id", nid)])
            .unwrap_or_default();
        Ok(self.repo.find(&filter, Scope::Active).await?)
    }

    pub async fn replace(&self, id: i64, update: NewIndividual) -> Result<Individual, ApiError> {
        update.validate()?;
        let current = self.repo.get_404(&id).await?;
        let replacement = Individual::from_update(current, update);
        self.store(replacement).await
    }

    pub async fn patch(&self, id: i64, patch: IndividualPatch) -> Result<Individual, ApiError> {
        patch.validate()?;
        let mut individual = self.repo.get_404(&id).await?;
        if let Some(v) = patch.national_id {
            individual.national_id = v;
        }
        if let Some(v) = patch.first_name {
            individual.first_name = v;
        }
        if let Some(v) = patch.last_name {
            individual.last_name = v;
        }
        if let Some(v) = patch.birth_date {
            individual.birth_date = v;
        }
        if let Some(v) = patch.gender {
            individual.gender = v;
        }
        if let Some(v) = patch.email {
            individual.email = v;
        }
        if let Some(v) = patch.phone_number {
            individual.phone_number = v;
        }
        if let Some(v) = patch.address {
            individual.address = v;
        }
        self.store(individual).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.soft_delete(&id, Utc::now()).await? {
            return Err(no_patient(id));
        }
        Ok(())
    }

    async fn store(&self, individual: Individual) -> Result<Individual, ApiError> {
        if !self.repo.update(&individual).await? {
            return Err(no_patient(individual.id));
        }
        Ok(individual)
    }
}

fn no_patient(id: i64) -> ApiError {
    ApiError::not_found(format!("No active patient found with Patient Id: {}", id))
}

impl Individual {
    fn from_update(current: Individual, update: NewIndividual) -> Individual {
        Individual {
            national_id: update.national_id,
            first_name: update.first_name,
            last_name: update.last_name,
            birth_date: update.birth_date,
            gender: update.gender,
            email: update.email,
            phone_number: update.phone_number,
            address: update.address,
            ..current
        }
    }
}
