/// Task model and database operations
///
/// Tasks are ordered within their list by `position`, the same way lists are
/// ordered within a board. A task's board is always its list's board; the
/// [`TaskView`] projection carries it for callers that need it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     list_id UUID NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     position DOUBLE PRECISION NOT NULL CHECK (position >= 0),
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     creator_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(format!(
                "priority must be one of low, medium, high, urgent (got '{}')",
                other
            )),
        }
    }
}

/// Unit of work on a list
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub position: f64,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task annotated with the board its list belongs to
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub task: Task,
    pub board_id: Uuid,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub position: f64,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
}

/// Partial update of a task's descriptive fields
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

const TASK_COLUMNS: &str = "t.id, t.list_id, t.title, t.description, t.priority, t.position, \
                            t.assignee_id, t.creator_id, t.created_at, t.updated_at";

impl Task {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, list_id, title, description, priority, position, assignee_id, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, list_id, title, description, priority, position,
                      assignee_id, creator_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.list_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.priority)
        .bind(data.position)
        .bind(data.assignee_id)
        .bind(data.creator_id)
        .fetch_one(executor)
        .await
    }

    /// Finds a task together with its board
    pub async fn find_view<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<TaskView>, sqlx::Error> {
        let sql = format!(
            "SELECT {}, l.board_id FROM tasks t JOIN lists l ON l.id = t.list_id WHERE t.id = $1",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, TaskView>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// All tasks on a board, in display order within each list
    pub async fn list_by_board<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tasks t JOIN lists l ON l.id = t.list_id \
             WHERE l.board_id = $1 \
             ORDER BY t.position ASC, t.created_at ASC, t.id ASC",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(board_id)
            .fetch_all(executor)
            .await
    }

    /// Highest position among the list's tasks, if any
    pub async fn last_position<'e, E: PgExecutor<'e>>(
        executor: E,
        list_id: Uuid,
    ) -> Result<Option<f64>, sqlx::Error> {
        let (position,): (Option<f64>,) =
            sqlx::query_as("SELECT MAX(position) FROM tasks WHERE list_id = $1")
                .bind(list_id)
                .fetch_one(executor)
                .await?;

        Ok(position)
    }

    /// Case-insensitive substring search over title and description, newest first
    pub async fn search<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM tasks t JOIN lists l ON l.id = t.list_id \
             WHERE l.board_id = $1 AND (t.title ILIKE $2 OR t.description ILIKE $2) \
             ORDER BY t.created_at DESC, t.id DESC \
             OFFSET $3 LIMIT $4",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(board_id)
            .bind(super::like_pattern(query))
            .bind(offset)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Count matching [`Task::search`]
    pub async fn count_search<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
        query: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM tasks t
            JOIN lists l ON l.id = t.list_id
            WHERE l.board_id = $1 AND (t.title ILIKE $2 OR t.description ILIKE $2)
            "#,
        )
        .bind(board_id)
        .bind(super::like_pattern(query))
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING id, list_id, title, description, priority, position,
                      assignee_id, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.priority)
        .fetch_optional(executor)
        .await
    }

    /// Sets or clears the assignee
    pub async fn assign<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET assignee_id = $2, updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING id, list_id, title, description, priority, position,
                      assignee_id, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(assignee_id)
        .fetch_optional(executor)
        .await
    }

    /// Changes list and position together
    pub async fn move_to<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        list_id: Uuid,
        position: f64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET list_id = $2, position = $3, updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING id, list_id, title, description, priority, position,
                      assignee_id, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(list_id)
        .bind(position)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
