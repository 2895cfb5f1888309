//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use bursar_shared::{Principal, Role};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the principal in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    // Validate token
    match state.jwt_service.validate_token(token) {
        Ok(principal) => {
            // Store the principal in request extensions
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            let (status, error, message) = match e {
                bursar_shared::JwtError::Expired => (
                    StatusCode::UNAUTHORIZED,
                    "token_expired",
                    "Token has expired",
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_token",
                    "Invalid or malformed token",
                ),
            };

            (status, Json(json!({ "error": error, "message": message }))).into_response()
        }
    }
}

/// Extractor for the authenticated principal.
///
/// Use this in handlers to get the authenticated caller:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    /// Returns the user ID from the principal.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.0.sub
    }

    /// Returns the caller's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the caller's school.
    #[must_use]
    pub const fn school_id(&self) -> i64 {
        self.0.school_id
    }

    /// Returns the caller's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Returns the inner principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.0
    }

    /// Requires the caller to hold one of the listed roles.
    ///
    /// # Errors
    ///
    /// Returns a 403 response otherwise.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), Response> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "message": "Your role cannot perform this operation"
                })),
            )
                .into_response())
        }
    }

    /// Requires the caller to belong to a department and returns it.
    ///
    /// # Errors
    ///
    /// Returns a 403 response for callers without a department.
    pub fn require_department(&self) -> Result<i64, Response> {
        self.0.department_id.ok_or_else(|| {
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "no_department",
                    "message": "This operation requires a department membership"
                })),
            )
                .into_response()
        })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_role_guard() {
        let auth = AuthUser(Principal::new(
            1,
            "Test",
            Role::Reviewer,
            1,
            Some(4),
            Utc::now(),
        ));
        assert!(auth.require_role(&[Role::Reviewer, Role::Admin]).is_ok());
        assert!(auth.require_role(&[Role::Admin]).is_err());
        assert_eq!(auth.require_department().unwrap(), 4);
    }

    #[test]
    fn test_department_guard_without_department() {
        let auth = AuthUser(Principal::new(1, "Test", Role::Author, 1, None, Utc::now()));
        assert!(auth.require_department().is_err());
    }
}
