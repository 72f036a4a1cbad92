use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::identity::{IdentityResolver, Onboardable, ResolvedIdentity};

/// Resolves (or provisions) the local record of callers holding `R::ROLE`
/// and injects its id. Callers without the role pass through untouched.
pub async fn resolve_identity_middleware<R: Onboardable>(
    State(resolver): State<Arc<IdentityResolver<R>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.identity.clone())
        .filter(|identity| identity.has_role(R::ROLE));

    if let Some(identity) = identity {
        let id = resolver.resolve(&identity).await?;
        tracing::debug!("Subject '{}' resolved to {} {}", identity.subject, R::KIND, id);
        request.extensions_mut().insert(ResolvedIdentity::<R>::new(id));
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S, R> FromRequestParts<S> for ResolvedIdentity<R>
where
    S: Send + Sync,
    R: Onboardable,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedIdentity<R>>()
            .copied()
            .ok_or_else(|| ApiError::forbidden(format!("This route requires a {} account", R::KIND)))
    }
}
