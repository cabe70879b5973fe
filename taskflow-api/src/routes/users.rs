/// User endpoints
///
/// - `GET /api/users/me` - The caller's profile
/// - `GET /api/users/search?q=` - Up to 10 other users by name or email

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserSummary},
    store::Store,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn me<S: Store>(State(state): State<AppState<S>>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = state.services.identity.current_user(auth.user_id).await?;
    Ok(Json(user))
}

pub async fn search<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = state
        .services
        .identity
        .search_users(&params.q, auth.user_id)
        .await?;
    Ok(Json(users))
}
