/// Bearer authentication for Axum
///
/// The HTTP layer and the realtime handshake both authenticate the same way:
/// pull an access token from the request, verify it with
/// [`TokenSettings::verify_access`], and carry the subject forward as an
/// [`AuthContext`].
///
/// # Request Extensions
///
/// After successful authentication the middleware inserts an `AuthContext`
/// into the request extensions. Handlers take it as an extractor argument.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Router};
/// use taskflow_shared::auth::jwt::TokenSettings;
/// use taskflow_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let tokens = Arc::new(TokenSettings::new("access-secret", "refresh-secret"));
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         jwt_auth_middleware(tokens.clone(), req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{Claims, JwtError, TokenSettings};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Reads the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Verifies an access token and builds the caller context
pub fn authenticate(settings: &TokenSettings, token: &str) -> Result<AuthContext, AuthError> {
    Ok(settings.verify_access(token)?.into())
}

/// JWT authentication middleware
///
/// Returns 401 when the header is missing, the token is invalid or expired,
/// or a refresh token is presented in place of an access token.
pub async fn jwt_auth_middleware(
    settings: Arc<TokenSettings>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;
    let context = authenticate(&settings, token)?;

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic xyz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_authenticate_accepts_only_access_tokens() {
        let settings = TokenSettings::new(
            "test-access-secret-at-least-32-bytes",
            "test-refresh-secret-at-least-32-bytes",
        );
        let user_id = Uuid::new_v4();
        let pair = settings.issue_pair(user_id, "a@b.co").unwrap();

        let context = authenticate(&settings, &pair.access_token).unwrap();
        assert_eq!(context.user_id, user_id);
        assert_eq!(context.email, "a@b.co");

        assert!(authenticate(&settings, &pair.refresh_token).is_err());
        assert!(authenticate(&settings, "garbage").is_err());
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("expired".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
