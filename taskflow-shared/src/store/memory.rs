/// In-memory store
///
/// Holds all rows in process. A unit of work operates on a private copy of
/// the state and swaps it in on success, so a failed closure leaves nothing
/// behind. Units of work are serialized by an async mutex.
///
/// Every committed write is appended to a journal in call order, which lets
/// tests assert sequencing such as "activity recorded, then row deleted".

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::activity::{ActivityAction, ActivityEntry, ActivityView, CreateActivity};
use crate::models::board::{Board, BoardPatch, CreateBoard};
use crate::models::list::{CreateList, List, ListPatch};
use crate::models::member::{BoardMember, CreateMembership, MemberDetail};
use crate::models::task::{CreateTask, Task, TaskPatch, TaskView};
use crate::models::user::{CreateUser, User, UserSummary};

/// A committed write, as recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    InsertUser,
    InsertBoard,
    UpdateBoard,
    DeleteBoard,
    InsertMember,
    DeleteMember,
    InsertList,
    UpdateList,
    DeleteList,
    InsertTask,
    UpdateTask,
    AssignTask,
    MoveTask,
    DeleteTask,
    RecordActivity(ActivityAction),
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    boards: Vec<Board>,
    members: Vec<BoardMember>,
    lists: Vec<List>,
    tasks: Vec<Task>,
    activity: Vec<ActivityEntry>,
}

impl MemoryState {
    fn user_summary(&self, id: Uuid) -> Option<UserSummary> {
        self.users.iter().find(|u| u.id == id).map(User::summary)
    }

    fn board_of_list(&self, list_id: Uuid) -> Option<Uuid> {
        self.lists.iter().find(|l| l.id == list_id).map(|l| l.board_id)
    }

    fn tasks_matching(&self, board_id: Uuid, query: &str) -> Vec<&Task> {
        let needle = query.to_lowercase();
        let list_ids: Vec<Uuid> = self
            .lists
            .iter()
            .filter(|l| l.board_id == board_id)
            .map(|l| l.id)
            .collect();

        // newest first
        self.tasks
            .iter()
            .rev()
            .filter(|t| list_ids.contains(&t.list_id))
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t
                        .description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }
}

struct Inner {
    state: tokio::sync::Mutex<MemoryState>,
    journal: Mutex<Vec<StoreOp>>,
}

/// Store that keeps everything in memory
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: tokio::sync::Mutex::new(MemoryState::default()),
                journal: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Committed writes, oldest first
    pub fn journal(&self) -> Vec<StoreOp> {
        self.inner
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_journal(&self) {
        self.inner
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Private working copy used by one transaction
pub struct MemoryUnitOfWork {
    state: MemoryState,
    ops: Vec<StoreOp>,
}

fn sort_by_position<T, F: Fn(&T) -> f64>(items: &mut [T], key: F) {
    // stable, so equal positions keep insertion order
    items.sort_by(|a, b| key(a).total_cmp(&key(b)));
}

fn window<T: Clone>(items: Vec<&T>, offset: i64, limit: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    type Uow = MemoryUnitOfWork;

    async fn transaction<F, R, E>(&self, work: F) -> Result<R, E>
    where
        F: for<'t> FnOnce(&'t mut Self::Uow) -> BoxFuture<'t, Result<R, E>> + Send,
        R: Send,
        E: From<StoreError> + Send,
    {
        let mut state = self.inner.state.lock().await;
        let mut uow = MemoryUnitOfWork {
            state: state.clone(),
            ops: Vec::new(),
        };

        let outcome = work(&mut uow).await;

        if outcome.is_ok() {
            *state = uow.state;
            self.inner
                .journal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(uow.ops);
        }

        outcome
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.inner.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.inner.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<UserSummary>> {
        let state = self.inner.state.lock().await;
        let needle = query.to_lowercase();
        let mut found: Vec<UserSummary> = state
            .users
            .iter()
            .filter(|u| u.id != exclude)
            .filter(|u| {
                u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
            })
            .map(User::summary)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(found)
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        let state = self.inner.state.lock().await;
        Ok(state.boards.iter().find(|b| b.id == id).cloned())
    }

    async fn boards_for_member(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        let state = self.inner.state.lock().await;
        let mut boards: Vec<Board> = state
            .boards
            .iter()
            .filter(|b| {
                state
                    .members
                    .iter()
                    .any(|m| m.board_id == b.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        boards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(boards)
    }

    async fn find_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BoardMember>> {
        let state = self.inner.state.lock().await;
        Ok(state
            .members
            .iter()
            .find(|m| m.board_id == board_id && m.user_id == user_id)
            .cloned())
    }

    async fn board_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberDetail>> {
        let state = self.inner.state.lock().await;
        Ok(state
            .members
            .iter()
            .filter(|m| m.board_id == board_id)
            .filter_map(|m| {
                state.user_summary(m.user_id).map(|user| MemberDetail {
                    board_id: m.board_id,
                    user_id: m.user_id,
                    role: m.role,
                    created_at: m.created_at,
                    user,
                })
            })
            .collect())
    }

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>> {
        let state = self.inner.state.lock().await;
        Ok(state.lists.iter().find(|l| l.id == id).cloned())
    }

    async fn lists_for_board(&self, board_id: Uuid) -> StoreResult<Vec<List>> {
        let state = self.inner.state.lock().await;
        let mut lists: Vec<List> = state
            .lists
            .iter()
            .filter(|l| l.board_id == board_id)
            .cloned()
            .collect();
        sort_by_position(&mut lists, |l| l.position);
        Ok(lists)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskView>> {
        let state = self.inner.state.lock().await;
        Ok(state.tasks.iter().find(|t| t.id == id).and_then(|task| {
            state.board_of_list(task.list_id).map(|board_id| TaskView {
                task: task.clone(),
                board_id,
            })
        }))
    }

    async fn tasks_for_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.inner.state.lock().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| state.board_of_list(t.list_id) == Some(board_id))
            .cloned()
            .collect();
        sort_by_position(&mut tasks, |t| t.position);
        Ok(tasks)
    }

    async fn search_tasks(
        &self,
        board_id: Uuid,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Task>> {
        let state = self.inner.state.lock().await;
        Ok(window(state.tasks_matching(board_id, query), offset, limit))
    }

    async fn count_task_matches(&self, board_id: Uuid, query: &str) -> StoreResult<i64> {
        let state = self.inner.state.lock().await;
        Ok(state.tasks_matching(board_id, query).len() as i64)
    }

    async fn board_activity(
        &self,
        board_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<ActivityView>> {
        let state = self.inner.state.lock().await;
        let entries: Vec<&ActivityEntry> = state
            .activity
            .iter()
            .rev()
            .filter(|a| a.board_id == board_id)
            .collect();

        Ok(window(entries, offset, limit)
            .into_iter()
            .filter_map(|entry| {
                state
                    .user_summary(entry.user_id)
                    .map(|user| ActivityView { entry, user })
            })
            .collect())
    }

    async fn count_board_activity(&self, board_id: Uuid) -> StoreResult<i64> {
        let state = self.inner.state.lock().await;
        Ok(state.activity.iter().filter(|a| a.board_id == board_id).count() as i64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        if self.state.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.state.users.push(user.clone());
        self.ops.push(StoreOp::InsertUser);
        Ok(user)
    }

    async fn insert_board(&mut self, data: CreateBoard) -> StoreResult<Board> {
        let now = Utc::now();
        let board = Board {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.state.boards.push(board.clone());
        self.ops.push(StoreOp::InsertBoard);
        Ok(board)
    }

    async fn update_board(&mut self, id: Uuid, patch: &BoardPatch) -> StoreResult<Option<Board>> {
        let Some(board) = self.state.boards.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            board.title = title.clone();
        }
        if let Some(description) = &patch.description {
            board.description = Some(description.clone());
        }
        board.updated_at = Utc::now();
        let updated = board.clone();
        self.ops.push(StoreOp::UpdateBoard);
        Ok(Some(updated))
    }

    async fn delete_board(&mut self, id: Uuid) -> StoreResult<bool> {
        let before = self.state.boards.len();
        self.state.boards.retain(|b| b.id != id);
        if self.state.boards.len() == before {
            return Ok(false);
        }

        let list_ids: Vec<Uuid> = self
            .state
            .lists
            .iter()
            .filter(|l| l.board_id == id)
            .map(|l| l.id)
            .collect();
        self.state.tasks.retain(|t| !list_ids.contains(&t.list_id));
        self.state.lists.retain(|l| l.board_id != id);
        self.state.members.retain(|m| m.board_id != id);
        self.state.activity.retain(|a| a.board_id != id);
        self.ops.push(StoreOp::DeleteBoard);
        Ok(true)
    }

    async fn insert_member(&mut self, data: CreateMembership) -> StoreResult<BoardMember> {
        if self
            .state
            .members
            .iter()
            .any(|m| m.board_id == data.board_id && m.user_id == data.user_id)
        {
            return Err(StoreError::UniqueViolation("board_members_pkey".to_string()));
        }

        let member = BoardMember {
            board_id: data.board_id,
            user_id: data.user_id,
            role: data.role,
            created_at: Utc::now(),
        };
        self.state.members.push(member.clone());
        self.ops.push(StoreOp::InsertMember);
        Ok(member)
    }

    async fn delete_member(&mut self, board_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let before = self.state.members.len();
        self.state
            .members
            .retain(|m| !(m.board_id == board_id && m.user_id == user_id));
        let removed = self.state.members.len() != before;
        if removed {
            self.ops.push(StoreOp::DeleteMember);
        }
        Ok(removed)
    }

    async fn last_list_position(&mut self, board_id: Uuid) -> StoreResult<Option<f64>> {
        Ok(self
            .state
            .lists
            .iter()
            .filter(|l| l.board_id == board_id)
            .map(|l| l.position)
            .reduce(f64::max))
    }

    async fn insert_list(&mut self, data: CreateList) -> StoreResult<List> {
        let now = Utc::now();
        let list = List {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            title: data.title,
            position: data.position,
            created_at: now,
            updated_at: now,
        };
        self.state.lists.push(list.clone());
        self.ops.push(StoreOp::InsertList);
        Ok(list)
    }

    async fn update_list(&mut self, id: Uuid, patch: &ListPatch) -> StoreResult<Option<List>> {
        let Some(list) = self.state.lists.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            list.title = title.clone();
        }
        if let Some(position) = patch.position {
            list.position = position;
        }
        list.updated_at = Utc::now();
        let updated = list.clone();
        self.ops.push(StoreOp::UpdateList);
        Ok(Some(updated))
    }

    async fn delete_list(&mut self, id: Uuid) -> StoreResult<bool> {
        let before = self.state.lists.len();
        self.state.lists.retain(|l| l.id != id);
        if self.state.lists.len() == before {
            return Ok(false);
        }
        self.state.tasks.retain(|t| t.list_id != id);
        self.ops.push(StoreOp::DeleteList);
        Ok(true)
    }

    async fn last_task_position(&mut self, list_id: Uuid) -> StoreResult<Option<f64>> {
        Ok(self
            .state
            .tasks
            .iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.position)
            .reduce(f64::max))
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            list_id: data.list_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            position: data.position,
            assignee_id: data.assignee_id,
            creator_id: data.creator_id,
            created_at: now,
            updated_at: now,
        };
        self.state.tasks.push(task.clone());
        self.ops.push(StoreOp::InsertTask);
        Ok(task)
    }

    async fn update_task(&mut self, id: Uuid, patch: &TaskPatch) -> StoreResult<Option<Task>> {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.ops.push(StoreOp::UpdateTask);
        Ok(Some(updated))
    }

    async fn assign_task(
        &mut self,
        id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> StoreResult<Option<Task>> {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.assignee_id = assignee_id;
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.ops.push(StoreOp::AssignTask);
        Ok(Some(updated))
    }

    async fn move_task(
        &mut self,
        id: Uuid,
        list_id: Uuid,
        position: f64,
    ) -> StoreResult<Option<Task>> {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.list_id = list_id;
        task.position = position;
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.ops.push(StoreOp::MoveTask);
        Ok(Some(updated))
    }

    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool> {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| t.id != id);
        let removed = self.state.tasks.len() != before;
        if removed {
            self.ops.push(StoreOp::DeleteTask);
        }
        Ok(removed)
    }

    async fn record_activity(&mut self, data: CreateActivity) -> StoreResult<ActivityEntry> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            action: data.action,
            entity_type: data.entity_type,
            entity_id: data.entity_id,
            details: data.details,
            user_id: data.user_id,
            board_id: data.board_id,
            created_at: Utc::now(),
        };
        self.state.activity.push(entry.clone());
        self.ops.push(StoreOp::RecordActivity(data.action));
        Ok(entry)
    }
}
