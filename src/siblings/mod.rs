// Questions one service asks another before it writes.
//
// `LocalSiblings` answers from repositories in the same process,
// `HttpSiblings` calls the internal endpoints of a separately deployed service.

pub mod http;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::Practitioner;
use crate::database::StoreError;

pub use http::HttpSiblings;
pub use local::LocalSiblings;

#[derive(Debug, Error)]
pub enum SiblingError {
    #[error("{0}")]
    Timeout(String),

    #[error("Transport error calling {service}: {reason}")]
    Transport { service: &'static str, reason: String },

    #[error("{service} answered with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Could not decode answer from {service}: {reason}")]
    Decode { service: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Gate for examination writes
#[async_trait]
pub trait AssociationChecks: Send + Sync {
    /// True when an active link joins the practitioner and the facility
    async fn check_association(&self, practitioner_id: i64, facility_id: i64) -> Result<bool, SiblingError>;

    async fn check_individual_exists(&self, individual_id: i64) -> Result<bool, SiblingError>;
}

#[async_trait]
pub trait PractitionerLookup: Send + Sync {
    /// `None` when no active practitioner has this id
    async fn get_practitioner(&self, id: i64) -> Result<Option<PractitionerSummary>, SiblingError>;
}

/// What other services are told about a practitioner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PractitionerSummary {
    pub id: i64,
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
}

impl From<&Practitioner> for PractitionerSummary {
    fn from(p: &Practitioner) -> Self {
        Self {
            id: p.id,
            license_number: p.license_number.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            specialty: p.specialty.clone(),
        }
    }
}

/// Body of the boolean internal endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Existence {
    pub exists: bool,
}
