/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/signup` - Create an account and get tokens
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Trade a refresh token for a new pair
///
/// All three answer with a session:
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "ada@example.com", "name": "Ada", ... },
///   "accessToken": "eyJ...",
///   "refreshToken": "eyJ...",
///   "expiresIn": 900
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use taskflow_shared::{
    services::{Session, Signup},
    store::Store,
};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (strength is checked by the identity service)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register a new user
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed or weak password
pub async fn signup<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    req.validate()?;

    let session = state
        .services
        .identity
        .signup(Signup {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Session>> {
    req.validate()?;

    let session = state.services.identity.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// Refresh the token pair
///
/// # Errors
///
/// - `401 Unauthorized`: Token invalid, expired, of the wrong type, or its
///   account no longer exists
pub async fn refresh<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<Session>> {
    let session = state.services.identity.refresh(&req.refresh_token).await?;
    Ok(Json(session))
}
