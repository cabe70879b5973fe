/// Task endpoints
///
/// # Endpoints
///
/// - `POST   /api/tasks` - Append a task to a list
/// - `GET    /api/tasks/search/:board_id?q=&page=&limit=` - Search a board
/// - `GET    /api/tasks/:id` - Task with its `boardId`
/// - `PUT    /api/tasks/:id` - Edit title, description, priority, assignee
/// - `PUT    /api/tasks/:id/move` - Move to a list and position
/// - `PUT    /api/tasks/:id/assign` - Set or clear (`null`) the assignee
/// - `DELETE /api/tasks/:id` - Delete
///
/// # Search Response
///
/// ```json
/// {
///   "tasks": [ ... ],
///   "pagination": { "page": 1, "limit": 20, "total": 25, "totalPages": 2 }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::task::{TaskPriority, TaskView},
    pagination::PageRequest,
    services::{NewTask, TaskSearchPage, TaskUpdate},
    store::Store,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// One of `low`, `medium`, `high`, `urgent`
    pub priority: Option<String>,

    pub list_id: Uuid,

    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub priority: Option<String>,

    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    #[serde(rename = "targetListId")]
    pub list_id: Uuid,

    #[validate(range(min = 0.0, message = "Position must not be negative"))]
    pub position: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub assignee_id: Option<Uuid>,
}

/// Raw query values; bad page/limit fall back to defaults
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_priority(raw: Option<String>) -> ApiResult<Option<TaskPriority>> {
    raw.map(|p| p.parse::<TaskPriority>())
        .transpose()
        .map_err(ApiError::InvalidInput)
}

pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .create(
            auth.user_id,
            NewTask {
                list_id: req.list_id,
                title: req.title,
                description: req.description,
                priority: parse_priority(req.priority)?,
                assignee_id: req.assignee_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(state.services.tasks.get(id, auth.user_id).await?))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;

    let update = TaskUpdate {
        title: req.title,
        description: req.description,
        priority: parse_priority(req.priority)?,
        assignee_id: req.assignee_id,
    };
    Ok(Json(state.services.tasks.update(id, auth.user_id, update).await?))
}

pub async fn move_task<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .move_task(id, auth.user_id, req.list_id, req.position)
        .await?;
    Ok(Json(task))
}

pub async fn assign<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    let task = state
        .services
        .tasks
        .assign(id, auth.user_id, req.assignee_id)
        .await?;
    Ok(Json(task))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let task = state.services.tasks.delete(id, auth.user_id).await?;
    Ok(Json(json!({
        "message": "Task deleted",
        "boardId": task.board_id,
        "taskId": task.task.id,
        "listId": task.task.list_id,
    })))
}

pub async fn search<S: Store>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<TaskSearchPage>> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref());
    let results = state
        .services
        .tasks
        .search(board_id, auth.user_id, &params.q, page)
        .await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority(None).unwrap(), None);
        assert_eq!(
            parse_priority(Some("urgent".to_string())).unwrap(),
            Some(TaskPriority::Urgent)
        );
        assert!(matches!(
            parse_priority(Some("critical".to_string())),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
