use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{AccessPolicy, IdentityClaims, JwtVerifier};
use crate::error::ApiError;

/// Token verification plus route policy, handed to the router at construction
#[derive(Clone)]
pub struct SecurityContext {
    pub verifier: Arc<JwtVerifier>,
    pub policy: Arc<AccessPolicy>,
}

impl SecurityContext {
    pub fn new(verifier: JwtVerifier, policy: AccessPolicy) -> Self {
        Self {
            verifier: Arc::new(verifier),
            policy: Arc::new(policy),
        }
    }
}

/// Authenticated caller, inserted by `jwt_auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: IdentityClaims,
}

impl From<IdentityClaims> for AuthUser {
    fn from(identity: IdentityClaims) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Skips public paths, otherwise verifies the bearer token, validates its
/// claims and applies the access policy before the request reaches a route
pub async fn jwt_auth_middleware(
    State(security): State<SecurityContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    if security.policy.is_public(&path) {
        return Ok(next.run(request).await);
    }

    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    let claims = security.verifier.verify(&token).map_err(|e| {
        debug!("Rejected token on {}: {}", path, e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let identity = IdentityClaims::try_from(claims)?;

    let method = request.method().as_str().to_string();
    if !security.policy.authorize(&method, &path, &identity.roles) {
        warn!(
            "Denied {} {} for subject '{}' with roles {:?}",
            method, path, identity.subject, identity.roles
        );
        return Err(ApiError::forbidden(format!("Access denied to {} {}", method, path)));
    }

    debug!("Authorized {} {} for subject '{}'", method, path, identity.subject);
    request.extensions_mut().insert(AuthUser::from(identity));

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(token.trim().to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
