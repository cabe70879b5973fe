/// Board endpoints
///
/// # Endpoints
///
/// - `POST   /api/boards` - Create a board (caller becomes owner)
/// - `GET    /api/boards` - Boards the caller belongs to
/// - `GET    /api/boards/:id` - Board with owner, members, lists and tasks
/// - `PUT    /api/boards/:id` - Edit title/description (any member)
/// - `DELETE /api/boards/:id` - Delete (owner only)
/// - `POST   /api/boards/:id/members` - Invite a user (any member)
/// - `DELETE /api/boards/:id/members/:user_id` - Remove a member (owner only)

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
    models::{
        board::{Board, BoardDetail, BoardOverview, BoardPatch},
        member::MemberDetail,
    },
    services::NewBoard,
    store::Store,
};
use uuid::Uuid;
use validator::Validate;

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Update board request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Add member request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardDetail>)> {
    req.validate()?;

    let board = state
        .services
        .boards
        .create(
            auth.user_id,
            NewBoard {
                title: req.title,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<BoardOverview>>> {
    Ok(Json(state.services.boards.list(auth.user_id).await?))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    Ok(Json(state.services.boards.get(id, auth.user_id).await?))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;

    let patch = BoardPatch {
        title: req.title,
        description: req.description,
    };
    Ok(Json(state.services.boards.update(id, auth.user_id, patch).await?))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.services.boards.delete(id, auth.user_id).await?;
    Ok(Json(json!({ "message": "Board deleted successfully" })))
}

pub async fn add_member<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberDetail>)> {
    let member = state
        .services
        .boards
        .add_member(id, auth.user_id, req.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    state
        .services
        .boards
        .remove_member(id, auth.user_id, user_id)
        .await?;
    Ok(Json(json!({ "message": "Member removed" })))
}
