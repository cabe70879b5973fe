/// PostgreSQL store
///
/// Reads go straight to the pool. Each unit of work wraps one sqlx
/// transaction; it commits when the closure succeeds and rolls back otherwise.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::activity::{ActivityEntry, ActivityView, CreateActivity};
use crate::models::board::{Board, BoardPatch, CreateBoard};
use crate::models::list::{CreateList, List, ListPatch};
use crate::models::member::{BoardMember, CreateMembership, MemberDetail};
use crate::models::task::{CreateTask, Task, TaskPatch, TaskView};
use crate::models::user::{CreateUser, User, UserSummary};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open database transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    type Uow = PgUnitOfWork;

    async fn transaction<F, R, E>(&self, work: F) -> Result<R, E>
    where
        F: for<'t> FnOnce(&'t mut Self::Uow) -> BoxFuture<'t, Result<R, E>> + Send,
        R: Send,
        E: From<StoreError> + Send,
    {
        let tx = self.pool.begin().await.map_err(StoreError::from)?;
        let mut uow = PgUnitOfWork { tx };

        let outcome = work(&mut uow).await;

        match outcome {
            Ok(value) => {
                uow.tx.commit().await.map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.tx.rollback().await {
                    warn!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<UserSummary>> {
        Ok(User::search(&self.pool, query, exclude, limit).await?)
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(Board::find_by_id(&self.pool, id).await?)
    }

    async fn boards_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        Ok(Board::list_for_member(&self.pool, user_id).await?)
    }

    async fn find_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BoardMember>> {
        Ok(BoardMember::find(&self.pool, board_id, user_id).await?)
    }

    async fn board_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberDetail>> {
        Ok(BoardMember::list_detailed(&self.pool, board_id).await?)
    }

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>> {
        Ok(List::find_by_id(&self.pool, id).await?)
    }

    async fn lists_for_board(&self, board_id: Uuid) -> StoreResult<Vec<List>> {
        Ok(List::list_by_board(&self.pool, board_id).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskView>> {
        Ok(Task::find_view(&self.pool, id).await?)
    }

    async fn tasks_for_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_board(&self.pool, board_id).await?)
    }

    async fn search_tasks(
        &self,
        board_id: Uuid,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Task>> {
        Ok(Task::search(&self.pool, board_id, query, offset, limit).await?)
    }

    async fn count_task_matches(&self, board_id: Uuid, query: &str) -> StoreResult<i64> {
        Ok(Task::count_search(&self.pool, board_id, query).await?)
    }

    async fn board_activity(
        &self,
        board_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<ActivityView>> {
        Ok(ActivityEntry::list_by_board(&self.pool, board_id, offset, limit).await?)
    }

    async fn count_board_activity(&self, board_id: Uuid) -> StoreResult<i64> {
        Ok(ActivityEntry::count_by_board(&self.pool, board_id).await?)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn insert_board(&mut self, data: CreateBoard) -> StoreResult<Board> {
        Ok(Board::create(&mut *self.tx, data).await?)
    }

    async fn update_board(&mut self, id: Uuid, patch: &BoardPatch) -> StoreResult<Option<Board>> {
        Ok(Board::update(&mut *self.tx, id, patch).await?)
    }

    async fn delete_board(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(Board::delete(&mut *self.tx, id).await?)
    }

    async fn insert_member(&mut self, data: CreateMembership) -> StoreResult<BoardMember> {
        Ok(BoardMember::create(&mut *self.tx, data).await?)
    }

    async fn delete_member(&mut self, board_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(BoardMember::delete(&mut *self.tx, board_id, user_id).await?)
    }

    async fn last_list_position(&mut self, board_id: Uuid) -> StoreResult<Option<f64>> {
        Ok(List::last_position(&mut *self.tx, board_id).await?)
    }

    async fn insert_list(&mut self, data: CreateList) -> StoreResult<List> {
        Ok(List::create(&mut *self.tx, data).await?)
    }

    async fn update_list(&mut self, id: Uuid, patch: &ListPatch) -> StoreResult<Option<List>> {
        Ok(List::update(&mut *self.tx, id, patch).await?)
    }

    async fn delete_list(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(List::delete(&mut *self.tx, id).await?)
    }

    async fn last_task_position(&mut self, list_id: Uuid) -> StoreResult<Option<f64>> {
        Ok(Task::last_position(&mut *self.tx, list_id).await?)
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&mut *self.tx, data).await?)
    }

    async fn update_task(&mut self, id: Uuid, patch: &TaskPatch) -> StoreResult<Option<Task>> {
        Ok(Task::update(&mut *self.tx, id, patch).await?)
    }

    async fn assign_task(
        &mut self,
        id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::assign(&mut *self.tx, id, assignee_id).await?)
    }

    async fn move_task(
        &mut self,
        id: Uuid,
        list_id: Uuid,
        position: f64,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::move_to(&mut *self.tx, id, list_id, position).await?)
    }

    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&mut *self.tx, id).await?)
    }

    async fn record_activity(&mut self, data: CreateActivity) -> StoreResult<ActivityEntry> {
        Ok(ActivityEntry::create(&mut *self.tx, data).await?)
    }
}
