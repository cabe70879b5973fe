/// Boards and their membership
///
/// Creating a board makes the creator its owner and first member. Any member
/// may edit the board or invite others; only the owner may delete it or
/// remove members.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::{broadcast, log_entry, required_text};
use crate::auth::authorization::{board_for_member, require_owner};
use crate::error::{ServiceError, ServiceResult};
use crate::models::activity::{ActivityAction, EntityType};
use crate::models::board::{Board, BoardDetail, BoardOverview, BoardPatch, CreateBoard, ListWithTasks};
use crate::models::member::{BoardRole, CreateMembership, MemberDetail};
use crate::models::task::Task;
use crate::realtime::{BoardEvent, EventName, EventPublisher};
use crate::store::{Store, StoreError, UnitOfWork};

/// Board creation input
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub description: Option<String>,
}

pub struct BoardService<S: Store> {
    store: Arc<S>,
    events: Arc<dyn EventPublisher>,
}

impl<S: Store> Clone for BoardService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: Store> BoardService<S> {
    pub fn new(store: Arc<S>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Creates the board, the owner membership and `BOARD_CREATED` together
    ///
    /// Nobody else can be watching a board that did not exist, so nothing is
    /// broadcast.
    pub async fn create(&self, owner_id: Uuid, input: NewBoard) -> ServiceResult<BoardDetail> {
        let title = required_text(&input.title, "Title")?;
        let data = CreateBoard {
            title,
            description: input.description,
            owner_id,
        };

        let board = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let board = uow.insert_board(data).await?;
                    uow.insert_member(CreateMembership {
                        board_id: board.id,
                        user_id: owner_id,
                        role: BoardRole::Owner,
                    })
                    .await?;
                    uow.record_activity(log_entry(
                        ActivityAction::BoardCreated,
                        EntityType::Board,
                        board.id,
                        json!({ "title": board.title }),
                        owner_id,
                        board.id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(board)
                })
            })
            .await?;

        tracing::info!(board_id = %board.id, %owner_id, "Board created");
        self.detail(board).await
    }

    /// Boards the user belongs to, most recently updated first
    pub async fn list(&self, user_id: Uuid) -> ServiceResult<Vec<BoardOverview>> {
        let boards = self.store.boards_for_member(user_id).await?;

        let mut overviews = Vec::with_capacity(boards.len());
        for board in boards {
            let members = self.store.board_members(board.id).await?;
            let list_count = self.store.lists_for_board(board.id).await?.len();
            overviews.push(BoardOverview {
                board,
                members,
                list_count,
            });
        }
        Ok(overviews)
    }

    /// Full board: owner, members, lists in order, each with its tasks in order
    pub async fn get(&self, board_id: Uuid, user_id: Uuid) -> ServiceResult<BoardDetail> {
        let (board, _) = board_for_member(self.store.as_ref(), board_id, user_id).await?;
        self.detail(board).await
    }

    pub async fn update(&self, board_id: Uuid, user_id: Uuid, patch: BoardPatch) -> ServiceResult<Board> {
        let patch = BoardPatch {
            title: patch
                .title
                .as_deref()
                .map(|t| required_text(t, "Title"))
                .transpose()?,
            description: patch.description,
        };
        board_for_member(self.store.as_ref(), board_id, user_id).await?;

        let board = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let board = uow
                        .update_board(board_id, &patch)
                        .await?
                        .ok_or(ServiceError::BoardNotFound)?;
                    uow.record_activity(log_entry(
                        ActivityAction::BoardUpdated,
                        EntityType::Board,
                        board_id,
                        serde_json::to_value(&patch).unwrap_or_default(),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(board)
                })
            })
            .await?;

        tracing::info!(%board_id, %user_id, "Board updated");
        broadcast(self.events.as_ref(), board_id, EventName::BoardUpdated, &board, user_id);
        Ok(board)
    }

    /// Owner-only; lists, tasks, memberships and activity go with it
    ///
    /// `board:deleted` reaches every subscriber, the owner's other tabs too.
    pub async fn delete(&self, board_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let board = self
            .store
            .find_board(board_id)
            .await?
            .ok_or(ServiceError::BoardNotFound)?;
        require_owner(&board, user_id)?;

        self.store
            .transaction(move |uow| {
                Box::pin(async move {
                    if !uow.delete_board(board_id).await? {
                        return Err(ServiceError::BoardNotFound);
                    }
                    Ok::<_, ServiceError>(())
                })
            })
            .await?;

        tracing::info!(%board_id, %user_id, "Board deleted");
        broadcast(
            self.events.as_ref(),
            board_id,
            EventName::BoardDeleted,
            &json!({ "boardId": board_id }),
            user_id,
        );
        Ok(())
    }

    /// Any member may invite an existing user
    pub async fn add_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> ServiceResult<MemberDetail> {
        board_for_member(self.store.as_ref(), board_id, user_id).await?;

        let target = self
            .store
            .find_user(target_user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        if self.store.find_membership(board_id, target_user_id).await?.is_some() {
            return Err(ServiceError::AlreadyMember);
        }

        let member_name = target.name.clone();
        let membership = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let membership = uow
                        .insert_member(CreateMembership {
                            board_id,
                            user_id: target_user_id,
                            role: BoardRole::Member,
                        })
                        .await
                        .map_err(|e| match e {
                            StoreError::UniqueViolation(_) => ServiceError::AlreadyMember,
                            other => other.into(),
                        })?;
                    uow.record_activity(log_entry(
                        ActivityAction::MemberAdded,
                        EntityType::Member,
                        target_user_id,
                        json!({ "memberName": member_name }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(membership)
                })
            })
            .await?;

        let member = MemberDetail {
            board_id: membership.board_id,
            user_id: membership.user_id,
            role: membership.role,
            created_at: membership.created_at,
            user: target.summary(),
        };

        tracing::info!(%board_id, member_id = %target_user_id, "Member added");
        broadcast(self.events.as_ref(), board_id, EventName::MemberAdded, &member, user_id);
        Ok(member)
    }

    /// Owner-only, and the owner cannot remove themselves
    pub async fn remove_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> ServiceResult<()> {
        let board = self
            .store
            .find_board(board_id)
            .await?
            .ok_or(ServiceError::BoardNotFound)?;
        require_owner(&board, user_id)?;
        if target_user_id == user_id {
            return Err(ServiceError::CannotRemoveSelf);
        }

        self.store
            .transaction(move |uow| {
                Box::pin(async move {
                    if !uow.delete_member(board_id, target_user_id).await? {
                        return Err(ServiceError::UserNotFound);
                    }
                    uow.record_activity(log_entry(
                        ActivityAction::MemberRemoved,
                        EntityType::Member,
                        target_user_id,
                        json!({ "removedUserId": target_user_id }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(())
                })
            })
            .await?;

        tracing::info!(%board_id, removed_user_id = %target_user_id, "Member removed");
        self.events.publish(
            BoardEvent::new(
                board_id,
                EventName::MemberRemoved,
                json!({ "boardId": board_id, "removedUserId": target_user_id }),
                user_id,
            )
            .revoking(target_user_id),
        );
        Ok(())
    }

    async fn detail(&self, board: Board) -> ServiceResult<BoardDetail> {
        let owner = self.store.find_user(board.owner_id).await?.map(|u| u.summary());
        let members = self.store.board_members(board.id).await?;
        let lists = self.store.lists_for_board(board.id).await?;

        let mut tasks_by_list: HashMap<Uuid, Vec<Task>> = HashMap::new();
        for task in self.store.tasks_for_board(board.id).await? {
            tasks_by_list.entry(task.list_id).or_default().push(task);
        }

        let lists = lists
            .into_iter()
            .map(|list| {
                let tasks = tasks_by_list.remove(&list.id).unwrap_or_default();
                ListWithTasks { list, tasks }
            })
            .collect();

        Ok(BoardDetail {
            board,
            owner,
            members,
            lists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lists::NewList;
    use crate::services::tasks::NewTask;
    use crate::services::testing::{drain, Harness};
    use crate::store::StoreOp;

    fn alpha() -> NewBoard {
        NewBoard {
            title: "Alpha".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_makes_creator_sole_owner() {
        let h = Harness::new();
        let a = h.user("Ada").await;

        let detail = h.services.boards.create(a, alpha()).await.unwrap();
        assert_eq!(detail.board.owner_id, a);
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].user_id, a);
        assert_eq!(detail.members[0].role, BoardRole::Owner);
        assert_eq!(detail.owner.as_ref().map(|o| o.id), Some(a));

        assert_eq!(
            h.store.journal(),
            vec![
                StoreOp::InsertBoard,
                StoreOp::InsertMember,
                StoreOp::RecordActivity(ActivityAction::BoardCreated),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_title_rejected_without_writes() {
        let h = Harness::new();
        let a = h.user("Ada").await;

        let result = h
            .services
            .boards
            .create(
                a,
                NewBoard {
                    title: "   ".to_string(),
                    description: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert!(h.store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_update_broadcasts_to_others_only() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;
        h.services.boards.add_member(board.id, a, b).await.unwrap();

        let mut a_rx = h.connect(a, board.id);
        let mut b_rx = h.connect(b, board.id);

        let patch = BoardPatch {
            title: Some("Alpha v2".to_string()),
            description: None,
        };
        let updated = h.services.boards.update(board.id, a, patch).await.unwrap();
        assert_eq!(updated.title, "Alpha v2");

        assert!(drain(&mut a_rx).is_empty());
        let frames = drain(&mut b_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "board:updated");
        assert_eq!(frames[0]["data"]["title"], "Alpha v2");
    }

    #[tokio::test]
    async fn test_outsider_cannot_update() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let c = h.user("Cleo").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;

        let result = h.services.boards.update(board.id, c, BoardPatch::default()).await;
        assert!(matches!(result, Err(ServiceError::NotAMember)));
    }

    #[tokio::test]
    async fn test_non_owner_delete_leaves_board_intact() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;
        h.services.boards.add_member(board.id, a, b).await.unwrap();
        let list = h
            .services
            .lists
            .create(
                a,
                NewList {
                    board_id: board.id,
                    title: "Todo".to_string(),
                },
            )
            .await
            .unwrap();
        h.services
            .tasks
            .create(a, NewTask::titled(list.id, "Write docs"))
            .await
            .unwrap();
        h.store.clear_journal();

        let result = h.services.boards.delete(board.id, b).await;
        assert!(matches!(result, Err(ServiceError::NotOwner)));
        assert!(h.store.journal().is_empty());

        let detail = h.services.boards.get(board.id, a).await.unwrap();
        assert_eq!(detail.lists.len(), 1);
        assert_eq!(detail.lists[0].tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reaches_every_connection_and_cascades() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;
        h.services
            .lists
            .create(
                a,
                NewList {
                    board_id: board.id,
                    title: "Todo".to_string(),
                },
            )
            .await
            .unwrap();
        let mut own_tab = h.connect(a, board.id);

        h.services.boards.delete(board.id, a).await.unwrap();

        let frames = drain(&mut own_tab);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "board:deleted");
        assert_eq!(frames[0]["data"]["boardId"], board.id.to_string());

        assert!(h.store.find_board(board.id).await.unwrap().is_none());
        assert!(h.store.lists_for_board(board.id).await.unwrap().is_empty());
        assert!(h.services.boards.list(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_member_checks() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;

        let missing = h.services.boards.add_member(board.id, a, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ServiceError::UserNotFound)));

        let member = h.services.boards.add_member(board.id, a, b).await.unwrap();
        assert_eq!(member.role, BoardRole::Member);
        assert_eq!(member.user.name, "Bob");

        let twice = h.services.boards.add_member(board.id, a, b).await;
        assert!(matches!(twice, Err(ServiceError::AlreadyMember)));

        let overview = h.services.boards.list(b).await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].members.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_member_rules() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;
        h.services.boards.add_member(board.id, a, b).await.unwrap();
        h.store.clear_journal();

        let by_member = h.services.boards.remove_member(board.id, b, a).await;
        assert!(matches!(by_member, Err(ServiceError::NotOwner)));

        let self_removal = h.services.boards.remove_member(board.id, a, a).await;
        assert!(matches!(self_removal, Err(ServiceError::CannotRemoveSelf)));
        assert!(h.store.journal().is_empty());

        let mut b_rx = h.connect(b, board.id);
        h.services.boards.remove_member(board.id, a, b).await.unwrap();
        assert_eq!(
            h.store.journal(),
            vec![
                StoreOp::DeleteMember,
                StoreOp::RecordActivity(ActivityAction::MemberRemoved),
            ]
        );

        let frames = drain(&mut b_rx);
        assert_eq!(frames[0]["event"], "member:removed");
        assert_eq!(frames[0]["data"]["removedUserId"], b.to_string());

        let gone = h.services.boards.get(board.id, b).await;
        assert!(matches!(gone, Err(ServiceError::NotAMember)));
    }

    #[tokio::test]
    async fn test_removed_member_stops_receiving_board_events() {
        let h = Harness::new();
        let a = h.user("Ada").await;
        let b = h.user("Bob").await;
        let c = h.user("Cy").await;
        let board = h.services.boards.create(a, alpha()).await.unwrap().board;
        h.services.boards.add_member(board.id, a, b).await.unwrap();
        h.services.boards.add_member(board.id, a, c).await.unwrap();

        let mut b_tab1 = h.connect(b, board.id);
        let mut b_tab2 = h.connect(b, board.id);
        let mut c_rx = h.connect(c, board.id);

        h.services.boards.remove_member(board.id, a, b).await.unwrap();
        assert_eq!(drain(&mut b_tab1).len(), 1);
        assert_eq!(drain(&mut b_tab2).len(), 1);
        drain(&mut c_rx);

        h.services
            .lists
            .create(
                a,
                NewList {
                    board_id: board.id,
                    title: "Secret plans".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(drain(&mut b_tab1).is_empty());
        assert!(drain(&mut b_tab2).is_empty());
        let frames = drain(&mut c_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["title"], "Secret plans");
    }
}
