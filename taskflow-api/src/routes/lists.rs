/// List endpoints
///
/// - `POST   /api/lists` - Append a list to a board
/// - `PUT    /api/lists/:id` - Rename and/or reposition
/// - `PUT    /api/lists/:id/reorder` - Reposition only
/// - `DELETE /api/lists/:id` - Delete the list and its tasks

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::list::{List, ListPatch},
    services::NewList,
    store::Store,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    pub board_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateListRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    #[validate(range(min = 0.0, message = "Position must not be negative"))]
    pub position: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderListRequest {
    #[validate(range(min = 0.0, message = "Position must not be negative"))]
    pub position: f64,
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Json(req): Json<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<List>)> {
    req.validate()?;

    let list = state
        .services
        .lists
        .create(
            auth.user_id,
            NewList {
                board_id: req.board_id,
                title: req.title,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateListRequest>,
) -> ApiResult<Json<List>> {
    req.validate()?;

    let patch = ListPatch {
        title: req.title,
        position: req.position,
    };
    Ok(Json(state.services.lists.update(id, auth.user_id, patch).await?))
}

pub async fn reorder<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderListRequest>,
) -> ApiResult<Json<List>> {
    req.validate()?;

    Ok(Json(
        state.services.lists.reorder(id, auth.user_id, req.position).await?,
    ))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let list = state.services.lists.delete(id, auth.user_id).await?;
    Ok(Json(json!({
        "message": "List deleted successfully",
        "boardId": list.board_id,
    })))
}
