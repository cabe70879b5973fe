/// Activity log model and database operations
///
/// The activity log is append-only. Entries are written inside the same
/// transaction as the change they describe and are removed only when their
/// board is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activity_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     action activity_action NOT NULL,
///     entity_type entity_type NOT NULL,
///     entity_id UUID NOT NULL,
///     details JSONB NOT NULL DEFAULT '{}'::jsonb,
///     user_id UUID NOT NULL REFERENCES users(id),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::UserSummary;

/// Kind of change recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    BoardCreated,
    BoardUpdated,
    MemberAdded,
    MemberRemoved,
    ListCreated,
    ListUpdated,
    ListReordered,
    ListDeleted,
    TaskCreated,
    TaskUpdated,
    TaskMoved,
    TaskAssigned,
    TaskDeleted,
}

/// Kind of entity an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Board,
    Member,
    List,
    Task,
}

/// Immutable log entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub details: Value,
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Entry together with the acting user's profile
#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub entry: ActivityEntry,
    pub user: UserSummary,
}

/// Input for recording an entry
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub details: Value,
    pub user_id: Uuid,
    pub board_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    #[sqlx(flatten)]
    entry: ActivityEntry,
    user_name: String,
    user_email: String,
}

impl From<ActivityRow> for ActivityView {
    fn from(row: ActivityRow) -> Self {
        let user = UserSummary {
            id: row.entry.user_id,
            name: row.user_name,
            email: row.user_email,
        };

        ActivityView {
            entry: row.entry,
            user,
        }
    }
}

impl ActivityEntry {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateActivity,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            r#"
            INSERT INTO activity_logs (id, action, entity_type, entity_id, details, user_id, board_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, action, entity_type, entity_id, details, user_id, board_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.action)
        .bind(data.entity_type)
        .bind(data.entity_id)
        .bind(&data.details)
        .bind(data.user_id)
        .bind(data.board_id)
        .fetch_one(executor)
        .await
    }

    /// Page of a board's entries, newest first
    pub async fn list_by_board<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ActivityView>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT a.id, a.action, a.entity_type, a.entity_id, a.details, a.user_id,
                   a.board_id, a.created_at, u.name AS user_name, u.email AS user_email
            FROM activity_logs a
            JOIN users u ON u.id = a.user_id
            WHERE a.board_id = $1
            ORDER BY a.created_at DESC, a.id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(board_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(ActivityView::from).collect())
    }

    pub async fn count_by_board<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activity_logs WHERE board_id = $1")
            .bind(board_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}
