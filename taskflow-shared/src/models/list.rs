/// List model and database operations
///
/// Lists are ordered within their board by `position` ascending. Positions are
/// sparse keys assigned by [`crate::ordering`]; equal positions fall back to
/// creation order.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE lists (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     position DOUBLE PRECISION NOT NULL CHECK (position >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Column of tasks on a board
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub position: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a list
#[derive(Debug, Clone)]
pub struct CreateList {
    pub board_id: Uuid,
    pub title: String,
    pub position: f64,
}

/// Partial update of a list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
}

impl List {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateList,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (id, board_id, title, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, board_id, title, position, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.board_id)
        .bind(&data.title)
        .bind(data.position)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, title, position, created_at, updated_at
            FROM lists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists of a board in display order
    pub async fn list_by_board<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, title, position, created_at, updated_at
            FROM lists
            WHERE board_id = $1
            ORDER BY position ASC, created_at ASC, id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    /// Highest position among the board's lists, if any
    pub async fn last_position<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Option<f64>, sqlx::Error> {
        let (position,): (Option<f64>,) =
            sqlx::query_as("SELECT MAX(position) FROM lists WHERE board_id = $1")
                .bind(board_id)
                .fetch_one(executor)
                .await?;

        Ok(position)
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        patch: &ListPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET title = COALESCE($2, title),
                position = COALESCE($3, position),
                updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING id, board_id, title, position, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(patch.position)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a list and its tasks
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
