pub mod policy;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub use policy::{AccessPolicy, AccessRule, PolicyError};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PRACTITIONER: &str = "practitioner";
pub const ROLE_FACILITY: &str = "facility";
pub const ROLE_SERVICE: &str = "service";

/// Raw JWT payload as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Verified, validated identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub phone_number: Option<String>,
    pub roles: Vec<String>,
}

impl IdentityClaims {
    pub fn new(subject: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            subject: subject.into(),
            email: String::new(),
            given_name: String::new(),
            family_name: String::new(),
            phone_number: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl TryFrom<Claims> for IdentityClaims {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let subject = claims.sub.trim().to_string();
        if subject.is_empty() {
            return Err(ApiError::bad_request("Malformed identity claim 'sub': must not be empty"));
        }

        let phone_number = match claims.phone_number.map(|p| p.trim().to_string()) {
            Some(p) if p.is_empty() => None,
            Some(p) => {
                let digits = p.strip_prefix('+').unwrap_or(&p);
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ApiError::bad_request(format!(
                        "Malformed identity claim 'phone_number': expected digits, got '{}'",
                        p
                    )));
                }
                Some(p)
            }
            None => None,
        };

        Ok(Self {
            subject,
            email: claims.email,
            given_name: claims.given_name,
            family_name: claims.family_name,
            phone_number,
            roles: claims.roles,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// HS256 token issuer and verifier built from the configured secret
#[derive(Clone)]
pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
}

impl JwtVerifier {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        })
    }

    /// Issue a token with the configured lifetime
    pub fn issue(&self, identity: &IdentityClaims) -> Result<String, JwtError> {
        self.issue_for(identity, Duration::hours(self.expiry_hours as i64))
    }

    pub fn issue_for(&self, identity: &IdentityClaims, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.subject.clone(),
            email: identity.email.clone(),
            given_name: identity.given_name.clone(),
            family_name: identity.family_name.clone(),
            phone_number: identity.phone_number.clone(),
            roles: identity.roles.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Check signature and expiry, returning the raw claims
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}
