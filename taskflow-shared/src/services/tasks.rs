/// Tasks (cards on a list)
///
/// Tasks do not store their board; every operation resolves the task's list
/// to find it, and authorizes against that board. Results come back as a
/// [`TaskView`] carrying the resolved `boardId`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{broadcast, log_entry, required_text};
use crate::auth::authorization::{board_for_member, verify_membership};
use crate::error::{ServiceError, ServiceResult};
use crate::models::activity::{ActivityAction, EntityType};
use crate::models::list::List;
use crate::models::task::{CreateTask, Task, TaskPatch, TaskPriority, TaskView};
use crate::ordering::{next_position, validate_position};
use crate::pagination::{PageRequest, Pagination};
use crate::realtime::{EventName, EventPublisher};
use crate::store::{Store, UnitOfWork};

/// Task creation input
#[derive(Debug, Clone)]
pub struct NewTask {
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
}

impl NewTask {
    pub fn titled(list_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            list_id,
            title: title.into(),
            description: None,
            priority: None,
            assignee_id: None,
        }
    }
}

/// Task edit; `assignee_id` here can only set an assignee, use
/// [`TaskService::assign`] to clear one
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct TaskSearchPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

pub struct TaskService<S: Store> {
    store: Arc<S>,
    events: Arc<dyn EventPublisher>,
}

impl<S: Store> Clone for TaskService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: Store> TaskService<S> {
    pub fn new(store: Arc<S>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Appends a task to the end of its list
    pub async fn create(&self, user_id: Uuid, input: NewTask) -> ServiceResult<TaskView> {
        let title = required_text(&input.title, "Title")?;
        let list = self
            .store
            .find_list(input.list_id)
            .await?
            .ok_or(ServiceError::ListNotFound)?;
        let board_id = list.board_id;
        verify_membership(self.store.as_ref(), board_id, user_id).await?;
        if let Some(assignee_id) = input.assignee_id {
            self.require_user(assignee_id).await?;
        }

        let list_id = list.id;
        let task = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let position = next_position(uow.last_task_position(list_id).await?);
                    let task = uow
                        .insert_task(CreateTask {
                            list_id,
                            title,
                            description: input.description,
                            priority: input.priority.unwrap_or_default(),
                            position,
                            assignee_id: input.assignee_id,
                            creator_id: user_id,
                        })
                        .await?;
                    uow.record_activity(log_entry(
                        ActivityAction::TaskCreated,
                        EntityType::Task,
                        task.id,
                        json!({ "title": task.title, "listId": list_id }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(task)
                })
            })
            .await?;

        let view = TaskView { task, board_id };
        tracing::info!(task_id = %view.task.id, %list_id, %board_id, "Task created");
        broadcast(self.events.as_ref(), board_id, EventName::TaskCreated, &view, user_id);
        Ok(view)
    }

    pub async fn get(&self, task_id: Uuid, user_id: Uuid) -> ServiceResult<TaskView> {
        self.authorized_task(task_id, user_id).await
    }

    pub async fn update(&self, task_id: Uuid, user_id: Uuid, update: TaskUpdate) -> ServiceResult<TaskView> {
        let patch = TaskPatch {
            title: update
                .title
                .as_deref()
                .map(|t| required_text(t, "Title"))
                .transpose()?,
            description: update.description,
            priority: update.priority,
        };
        let current = self.authorized_task(task_id, user_id).await?;
        let assignee_id = update.assignee_id;
        if let Some(assignee_id) = assignee_id {
            self.require_user(assignee_id).await?;
        }

        let board_id = current.board_id;
        let task = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let mut task = uow
                        .update_task(task_id, &patch)
                        .await?
                        .ok_or(ServiceError::TaskNotFound)?;
                    if assignee_id.is_some() {
                        task = uow
                            .assign_task(task_id, assignee_id)
                            .await?
                            .ok_or(ServiceError::TaskNotFound)?;
                    }

                    let mut details = match serde_json::to_value(&patch) {
                        Ok(Value::Object(map)) => map,
                        _ => Map::new(),
                    };
                    if let Some(assignee_id) = assignee_id {
                        details.insert("assigneeId".to_string(), json!(assignee_id));
                    }
                    uow.record_activity(log_entry(
                        ActivityAction::TaskUpdated,
                        EntityType::Task,
                        task_id,
                        Value::Object(details),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(task)
                })
            })
            .await?;

        let view = TaskView { task, board_id };
        tracing::info!(%task_id, %board_id, "Task updated");
        broadcast(self.events.as_ref(), board_id, EventName::TaskUpdated, &view, user_id);
        Ok(view)
    }

    /// Moves a task to `position` in `target_list_id`, possibly the same list
    ///
    /// The destination must be a list on the task's own board.
    pub async fn move_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        target_list_id: Uuid,
        position: f64,
    ) -> ServiceResult<TaskView> {
        let position = validate_position(position)?;
        let current = self.authorized_task(task_id, user_id).await?;
        let board_id = current.board_id;

        let target: Option<List> = self.store.find_list(target_list_id).await?;
        if !target.is_some_and(|list| list.board_id == board_id) {
            return Err(ServiceError::TargetListNotFound);
        }

        let from_list_id = current.task.list_id;
        let task = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let task = uow
                        .move_task(task_id, target_list_id, position)
                        .await?
                        .ok_or(ServiceError::TaskNotFound)?;
                    uow.record_activity(log_entry(
                        ActivityAction::TaskMoved,
                        EntityType::Task,
                        task_id,
                        json!({
                            "fromListId": from_list_id,
                            "toListId": target_list_id,
                            "position": position,
                        }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(task)
                })
            })
            .await?;

        let view = TaskView { task, board_id };
        tracing::info!(%task_id, %from_list_id, to_list_id = %target_list_id, position, "Task moved");
        broadcast(self.events.as_ref(), board_id, EventName::TaskMoved, &view, user_id);
        Ok(view)
    }

    /// Sets or clears the assignee
    pub async fn assign(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> ServiceResult<TaskView> {
        let current = self.authorized_task(task_id, user_id).await?;
        if let Some(assignee_id) = assignee_id {
            self.require_user(assignee_id).await?;
        }

        let board_id = current.board_id;
        let task = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let task = uow
                        .assign_task(task_id, assignee_id)
                        .await?
                        .ok_or(ServiceError::TaskNotFound)?;
                    uow.record_activity(log_entry(
                        ActivityAction::TaskAssigned,
                        EntityType::Task,
                        task_id,
                        json!({ "assigneeId": assignee_id }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(task)
                })
            })
            .await?;

        let view = TaskView { task, board_id };
        tracing::info!(%task_id, assignee_id = ?assignee_id, "Task assigned");
        broadcast(self.events.as_ref(), board_id, EventName::TaskAssigned, &view, user_id);
        Ok(view)
    }

    /// Logs `TASK_DELETED`, then deletes the task
    ///
    /// Returns the task as it was before deletion.
    pub async fn delete(&self, task_id: Uuid, user_id: Uuid) -> ServiceResult<TaskView> {
        let current = self.authorized_task(task_id, user_id).await?;
        let board_id = current.board_id;
        let list_id = current.task.list_id;
        let title = current.task.title.clone();

        self.store
            .transaction(move |uow| {
                Box::pin(async move {
                    uow.record_activity(log_entry(
                        ActivityAction::TaskDeleted,
                        EntityType::Task,
                        task_id,
                        json!({ "title": title, "listId": list_id }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    if !uow.delete_task(task_id).await? {
                        return Err(ServiceError::TaskNotFound);
                    }
                    Ok::<_, ServiceError>(())
                })
            })
            .await?;

        tracing::info!(%task_id, %board_id, "Task deleted");
        broadcast(
            self.events.as_ref(),
            board_id,
            EventName::TaskDeleted,
            &json!({
                "message": "Task deleted",
                "boardId": board_id,
                "taskId": task_id,
                "listId": list_id,
            }),
            user_id,
        );
        Ok(current)
    }

    /// Case-insensitive substring search over title and description,
    /// newest first
    pub async fn search(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        query: &str,
        page: PageRequest,
    ) -> ServiceResult<TaskSearchPage> {
        board_for_member(self.store.as_ref(), board_id, user_id).await?;

        let query = query.trim();
        let total = self.store.count_task_matches(board_id, query).await?;
        let tasks = self
            .store
            .search_tasks(board_id, query, page.offset(), page.limit)
            .await?;

        Ok(TaskSearchPage {
            tasks,
            pagination: Pagination::new(page, total),
        })
    }

    /// Resolves the task, then checks membership on its board
    async fn authorized_task(&self, task_id: Uuid, user_id: Uuid) -> ServiceResult<TaskView> {
        let view = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound)?;
        verify_membership(self.store.as_ref(), view.board_id, user_id).await?;
        Ok(view)
    }

    async fn require_user(&self, user_id: Uuid) -> ServiceResult<()> {
        self.store
            .find_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(ServiceError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::boards::NewBoard;
    use crate::services::lists::NewList;
    use crate::services::testing::{drain, Harness};
    use crate::store::StoreOp;

    struct Alpha {
        board_id: Uuid,
        todo: Uuid,
        doing: Uuid,
    }

    async fn alpha(h: &Harness, owner: Uuid) -> Alpha {
        let board = h
            .services
            .boards
            .create(
                owner,
                NewBoard {
                    title: "Alpha".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .board;
        let mut ids = Vec::new();
        for title in ["Todo", "Doing"] {
            let list = h
                .services
                .lists
                .create(
                    owner,
                    NewList {
                        board_id: board.id,
                        title: title.to_string(),
                    },
                )
                .await
                .unwrap();
            ids.push(list.id);
        }
        Alpha {
            board_id: board.id,
            todo: ids[0],
            doing: ids[1],
        }
    }

    #[tokio::test]
    async fn test_alpha_move_scenario() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let alpha = alpha(&h, a).await;
        h.services.boards.add_member(alpha.board_id, a, b).await.unwrap();

        let lists = h.store.lists_for_board(alpha.board_id).await.unwrap();
        assert_eq!(lists[0].position, 1024.0);
        assert_eq!(lists[1].position, 2048.0);

        let created = h
            .services
            .tasks
            .create(a, NewTask::titled(alpha.todo, "Write docs"))
            .await
            .unwrap();
        assert_eq!(created.task.position, 1024.0);
        assert_eq!(created.task.priority, TaskPriority::Medium);
        assert_eq!(created.board_id, alpha.board_id);

        let mut a_phone = h.connect(a, alpha.board_id);
        let mut a_laptop = h.connect(a, alpha.board_id);
        let mut b_rx = h.connect(b, alpha.board_id);

        let moved = h
            .services
            .tasks
            .move_task(created.task.id, a, alpha.doing, 512.0)
            .await
            .unwrap();
        assert_eq!(moved.task.list_id, alpha.doing);
        assert_eq!(moved.task.position, 512.0);

        let activity = h.store.board_activity(alpha.board_id, 0, 1).await.unwrap();
        let entry = &activity[0].entry;
        assert_eq!(entry.action, ActivityAction::TaskMoved);
        assert_eq!(
            entry.details,
            json!({
                "fromListId": alpha.todo,
                "toListId": alpha.doing,
                "position": 512.0,
            })
        );

        assert!(drain(&mut a_phone).is_empty());
        assert!(drain(&mut a_laptop).is_empty());
        let frames = drain(&mut b_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "task:moved");
        assert_eq!(frames[0]["data"]["listId"], alpha.doing.to_string());
    }

    #[tokio::test]
    async fn test_create_checks_list_membership_and_assignee() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let c = h.user("Cleo").await;
        let alpha = alpha(&h, a).await;

        let missing = h.services.tasks.create(a, NewTask::titled(Uuid::new_v4(), "x")).await;
        assert!(matches!(missing, Err(ServiceError::ListNotFound)));

        let outsider = h.services.tasks.create(c, NewTask::titled(alpha.todo, "x")).await;
        assert!(matches!(outsider, Err(ServiceError::NotAMember)));

        let mut ghost = NewTask::titled(alpha.todo, "x");
        ghost.assignee_id = Some(Uuid::new_v4());
        let ghost = h.services.tasks.create(a, ghost).await;
        assert!(matches!(ghost, Err(ServiceError::UserNotFound)));

        let first = h.services.tasks.create(a, NewTask::titled(alpha.todo, "one")).await.unwrap();
        let second = h.services.tasks.create(a, NewTask::titled(alpha.todo, "two")).await.unwrap();
        assert_eq!(first.task.position, 1024.0);
        assert_eq!(second.task.position, 2048.0);
    }

    #[tokio::test]
    async fn test_move_rejects_foreign_or_missing_list() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let mine = alpha(&h, a).await;
        let other = alpha(&h, a).await;
        let task = h
            .services
            .tasks
            .create(a, NewTask::titled(mine.todo, "Write docs"))
            .await
            .unwrap();
        h.store.clear_journal();

        let foreign = h.services.tasks.move_task(task.task.id, a, other.doing, 0.0).await;
        assert!(matches!(foreign, Err(ServiceError::TargetListNotFound)));

        let missing = h.services.tasks.move_task(task.task.id, a, Uuid::new_v4(), 0.0).await;
        assert!(matches!(missing, Err(ServiceError::TargetListNotFound)));

        let nowhere = h.services.tasks.move_task(Uuid::new_v4(), a, mine.doing, 0.0).await;
        assert!(matches!(nowhere, Err(ServiceError::TaskNotFound)));

        assert!(h.store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_assign() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let alpha = alpha(&h, a).await;
        let task = h
            .services
            .tasks
            .create(a, NewTask::titled(alpha.todo, "Write docs"))
            .await
            .unwrap();

        let updated = h
            .services
            .tasks
            .update(
                task.task.id,
                a,
                TaskUpdate {
                    priority: Some(TaskPriority::Urgent),
                    assignee_id: Some(b),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.task.priority, TaskPriority::Urgent);
        assert_eq!(updated.task.assignee_id, Some(b));
        assert_eq!(updated.task.title, "Write docs");

        let cleared = h.services.tasks.assign(task.task.id, a, None).await.unwrap();
        assert_eq!(cleared.task.assignee_id, None);

        let journal = h.store.journal();
        assert_eq!(
            &journal[journal.len() - 2..],
            &[
                StoreOp::AssignTask,
                StoreOp::RecordActivity(ActivityAction::TaskAssigned),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_logs_then_deletes() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let alpha = alpha(&h, a).await;
        h.services.boards.add_member(alpha.board_id, a, b).await.unwrap();
        let task = h
            .services
            .tasks
            .create(a, NewTask::titled(alpha.todo, "Write docs"))
            .await
            .unwrap();
        let mut b_rx = h.connect(b, alpha.board_id);
        h.store.clear_journal();

        let deleted = h.services.tasks.delete(task.task.id, a).await.unwrap();
        assert_eq!(deleted.task.id, task.task.id);
        assert_eq!(
            h.store.journal(),
            vec![
                StoreOp::RecordActivity(ActivityAction::TaskDeleted),
                StoreOp::DeleteTask,
            ]
        );

        let frames = drain(&mut b_rx);
        assert_eq!(
            frames[0]["data"],
            json!({
                "message": "Task deleted",
                "boardId": alpha.board_id,
                "taskId": task.task.id,
                "listId": alpha.todo,
            })
        );

        let again = h.services.tasks.get(task.task.id, a).await;
        assert!(matches!(again, Err(ServiceError::TaskNotFound)));
    }

    #[tokio::test]
    async fn test_search_pagination() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let alpha = alpha(&h, a).await;
        for i in 0..25 {
            let mut task = NewTask::titled(alpha.todo, format!("Deploy step {}", i));
            if i % 5 == 0 {
                task.title = format!("Step {}", i);
                task.description = Some("needs a DEPLOY window".to_string());
            }
            h.services.tasks.create(a, task).await.unwrap();
        }
        h.services
            .tasks
            .create(a, NewTask::titled(alpha.doing, "Unrelated"))
            .await
            .unwrap();

        let first = h
            .services
            .tasks
            .search(alpha.board_id, a, "deploy", PageRequest::parse(None, None))
            .await
            .unwrap();
        assert_eq!(first.tasks.len(), 20);
        assert_eq!(first.pagination.total, 25);
        assert_eq!(first.pagination.total_pages, 2);

        let second = h
            .services
            .tasks
            .search(alpha.board_id, a, "deploy", PageRequest::parse(Some("2"), Some("20")))
            .await
            .unwrap();
        assert_eq!(second.tasks.len(), 5);

        let none = h
            .services
            .tasks
            .search(alpha.board_id, a, "zzz", PageRequest::default())
            .await
            .unwrap();
        assert!(none.tasks.is_empty());
        assert_eq!(none.pagination.total, 0);
        assert_eq!(none.pagination.total_pages, 0);
    }

    #[tokio::test]
    async fn test_search_empty_query_and_page_bounds() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let c = h.user("Cleo").await;
        let alpha = alpha(&h, a).await;
        for i in 0..25 {
            h.services
                .tasks
                .create(a, NewTask::titled(alpha.todo, format!("Task {}", i)))
                .await
                .unwrap();
        }

        let everything = h
            .services
            .tasks
            .search(alpha.board_id, a, "   ", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(everything.tasks.len(), 20);
        assert_eq!(everything.pagination.total, 25);
        assert_eq!(everything.pagination.total_pages, 2);
        assert_eq!(everything.tasks[0].title, "Task 24");

        let last = h
            .services
            .tasks
            .search(alpha.board_id, a, "", PageRequest::parse(Some("2"), None))
            .await
            .unwrap();
        assert_eq!(last.tasks.len(), 5);
        assert_eq!(last.pagination.page, 2);
        assert_eq!(last.pagination.total_pages, 2);
        assert_eq!(last.tasks[4].title, "Task 0");

        let beyond = h
            .services
            .tasks
            .search(alpha.board_id, a, "", PageRequest::parse(Some("5"), None))
            .await
            .unwrap();
        assert!(beyond.tasks.is_empty());
        assert_eq!(beyond.pagination.page, 5);
        assert_eq!(beyond.pagination.total, 25);
        assert_eq!(beyond.pagination.total_pages, 2);

        let outsider = h
            .services
            .tasks
            .search(alpha.board_id, c, "", PageRequest::default())
            .await;
        assert!(matches!(outsider, Err(ServiceError::NotAMember)));
    }
}
