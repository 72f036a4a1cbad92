pub mod auth;
pub mod extract;
pub mod identity;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser, SecurityContext};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use identity::resolve_identity_middleware;
pub use response::{ApiResponse, ApiResult};
