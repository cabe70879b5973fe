/// Activity endpoint
///
/// `GET /api/activity/:board_id?page=&limit=` returns the board's audit trail,
/// newest first:
///
/// ```json
/// {
///   "activities": [
///     { "id": "uuid", "action": "TASK_MOVED", "entityType": "task", "details": { ... },
///       "user": { "id": "uuid", "name": "Ada", "email": "ada@example.com" }, ... }
///   ],
///   "pagination": { "page": 1, "limit": 20, "total": 42, "totalPages": 3 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext, pagination::PageRequest, services::ActivityPage, store::Store,
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ActivityPage>> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref());
    let activity = state
        .services
        .activity
        .query(board_id, auth.user_id, page)
        .await?;
    Ok(Json(activity))
}
