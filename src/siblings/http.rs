use async_trait::async_trait;
use chrono::Duration;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AssociationChecks, Existence, PractitionerLookup, PractitionerSummary, SiblingError};
use crate::auth::{IdentityClaims, JwtVerifier, ROLE_SERVICE};
use crate::config::SiblingConfig;

const SERVICE_SUBJECT: &str = "clinic-sibling";

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Calls the internal endpoints of separately deployed services
#[derive(Clone)]
pub struct HttpSiblings {
    client: reqwest::Client,
    practitioner_url: String,
    facility_url: String,
    individual_url: String,
    timeout_ms: u64,
    verifier: JwtVerifier,
}

impl HttpSiblings {
    pub fn new(config: &SiblingConfig, verifier: JwtVerifier) -> Result<Self, SiblingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SiblingError::Transport {
                service: "http client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            practitioner_url: config.practitioner_url.trim_end_matches('/').to_string(),
            facility_url: config.facility_url.trim_end_matches('/').to_string(),
            individual_url: config.individual_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            verifier,
        })
    }

    /// Short-lived token carrying only the service role
    fn service_token(&self, service: &'static str) -> Result<String, SiblingError> {
        let identity = IdentityClaims::new(SERVICE_SUBJECT, &[ROLE_SERVICE]);
        self.verifier
            .issue_for(&identity, Duration::minutes(5))
            .map_err(|e| SiblingError::Transport {
                service,
                reason: e.to_string(),
            })
    }

    /// GET an enveloped JSON answer; a 404 means absent
    async fn get_json<T: DeserializeOwned>(&self, service: &'static str, url: String) -> Result<Option<T>, SiblingError> {
        let token = self.service_token(service)?;
        tracing::debug!("Calling {} at {}", service, url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.classify(service, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let envelope = response
                    .json::<Envelope<T>>()
                    .await
                    .map_err(|e| self.classify(service, e))?;
                Ok(Some(envelope.data))
            }
            status => Err(SiblingError::Status {
                service,
                status: status.as_u16(),
            }),
        }
    }

    /// Boolean endpoints always answer; a 404 means the route is not mounted there
    async fn exists(&self, service: &'static str, url: String) -> Result<bool, SiblingError> {
        match self.get_json::<Existence>(service, url).await? {
            Some(answer) => Ok(answer.exists),
            None => Err(SiblingError::Status {
                service,
                status: StatusCode::NOT_FOUND.as_u16(),
            }),
        }
    }

    fn classify(&self, service: &'static str, err: reqwest::Error) -> SiblingError {
        if err.is_timeout() {
            SiblingError::Timeout(format!("{} did not answer within {}ms", service, self.timeout_ms))
        } else if err.is_decode() {
            SiblingError::Decode {
                service,
                reason: err.to_string(),
            }
        } else {
            SiblingError::Transport {
                service,
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl AssociationChecks for HttpSiblings {
    async fn check_association(&self, practitioner_id: i64, facility_id: i64) -> Result<bool, SiblingError> {
        let url = format!(
            "{}/internal/associations?practitioner_id={}&facility_id={}",
            self.facility_url, practitioner_id, facility_id
        );
        self.exists("facility service", url).await
    }

    async fn check_individual_exists(&self, individual_id: i64) -> Result<bool, SiblingError> {
        let url = format!("{}/internal/individuals/{}/exists", self.individual_url, individual_id);
        self.exists("individual service", url).await
    }
}

#[async_trait]
impl PractitionerLookup for HttpSiblings {
    async fn get_practitioner(&self, id: i64) -> Result<Option<PractitionerSummary>, SiblingError> {
        let url = format!("{}/internal/practitioners/{}", self.practitioner_url, id);
        self.get_json("practitioner service", url).await
    }
}
