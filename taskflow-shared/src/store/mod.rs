/// Persistence boundary
///
/// Services read through [`Store`] and write exclusively through a
/// [`UnitOfWork`] handed to the closure passed to [`Store::transaction`]. The
/// closure's writes commit together when it returns `Ok` and are discarded when
/// it returns `Err`, so an entity change and its activity entry can never be
/// observed apart.
///
/// # Implementations
///
/// - [`PgStore`]: PostgreSQL via sqlx, one database transaction per unit of work
/// - [`MemoryStore`]: in-process state with snapshot/commit semantics and a
///   journal of committed writes, used by tests and local runs
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::error::ServiceError;
/// use taskflow_shared::models::board::CreateBoard;
/// use taskflow_shared::store::{MemoryStore, Store, UnitOfWork};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), ServiceError> {
/// let store = MemoryStore::new();
/// let owner_id = Uuid::new_v4();
///
/// let board = store
///     .transaction(move |uow| {
///         Box::pin(async move {
///             let board = uow
///                 .insert_board(CreateBoard {
///                     title: "Roadmap".to_string(),
///                     description: None,
///                     owner_id,
///                 })
///                 .await?;
///             Ok::<_, ServiceError>(board)
///         })
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::models::activity::{ActivityEntry, ActivityView, CreateActivity};
use crate::models::board::{Board, BoardPatch, CreateBoard};
use crate::models::list::{CreateList, List, ListPatch};
use crate::models::member::{BoardMember, CreateMembership, MemberDetail};
use crate::models::task::{CreateTask, Task, TaskPatch, TaskView};
use crate::models::user::{CreateUser, User, UserSummary};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

/// Errors raised by a store implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read side of the repository plus the transaction runner
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Uow: UnitOfWork;

    /// Runs `work` atomically
    ///
    /// The closure must own everything it captures; it receives the unit of
    /// work by mutable reference for the duration of the transaction.
    async fn transaction<F, R, E>(&self, work: F) -> Result<R, E>
    where
        F: for<'t> FnOnce(&'t mut Self::Uow) -> BoxFuture<'t, Result<R, E>> + Send,
        R: Send,
        E: From<StoreError> + Send;

    /// Cheap liveness check
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<UserSummary>>;

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>>;
    async fn boards_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Board>>;
    async fn find_membership(&self, board_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<BoardMember>>;
    async fn board_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberDetail>>;

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>>;
    async fn lists_for_board(&self, board_id: Uuid) -> StoreResult<Vec<List>>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskView>>;
    async fn tasks_for_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>>;
    async fn search_tasks(
        &self,
        board_id: Uuid,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Task>>;
    async fn count_task_matches(&self, board_id: Uuid, query: &str) -> StoreResult<i64>;

    async fn board_activity(
        &self,
        board_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<ActivityView>>;
    async fn count_board_activity(&self, board_id: Uuid) -> StoreResult<i64>;
}

/// Write side, only reachable inside [`Store::transaction`]
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User>;

    async fn insert_board(&mut self, data: CreateBoard) -> StoreResult<Board>;
    async fn update_board(&mut self, id: Uuid, patch: &BoardPatch) -> StoreResult<Option<Board>>;
    async fn delete_board(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn insert_member(&mut self, data: CreateMembership) -> StoreResult<BoardMember>;
    async fn delete_member(&mut self, board_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    async fn last_list_position(&mut self, board_id: Uuid) -> StoreResult<Option<f64>>;
    async fn insert_list(&mut self, data: CreateList) -> StoreResult<List>;
    async fn update_list(&mut self, id: Uuid, patch: &ListPatch) -> StoreResult<Option<List>>;
    async fn delete_list(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn last_task_position(&mut self, list_id: Uuid) -> StoreResult<Option<f64>>;
    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task>;
    async fn update_task(&mut self, id: Uuid, patch: &TaskPatch) -> StoreResult<Option<Task>>;
    async fn assign_task(&mut self, id: Uuid, assignee_id: Option<Uuid>)
        -> StoreResult<Option<Task>>;
    async fn move_task(&mut self, id: Uuid, list_id: Uuid, position: f64)
        -> StoreResult<Option<Task>>;
    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn record_activity(&mut self, data: CreateActivity) -> StoreResult<ActivityEntry>;
}
