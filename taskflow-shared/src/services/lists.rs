/// Lists (board columns)
///
/// Lists are ordered by position within their board. New lists append after
/// the last one; reordering writes the requested position to the moved list
/// only.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::{broadcast, log_entry, required_text};
use crate::auth::authorization::{board_for_member, verify_membership};
use crate::error::{ServiceError, ServiceResult};
use crate::models::activity::{ActivityAction, EntityType};
use crate::models::list::{CreateList, List, ListPatch};
use crate::ordering::{next_position, validate_position};
use crate::realtime::{EventName, EventPublisher};
use crate::store::{Store, UnitOfWork};

/// List creation input
#[derive(Debug, Clone)]
pub struct NewList {
    pub board_id: Uuid,
    pub title: String,
}

pub struct ListService<S: Store> {
    store: Arc<S>,
    events: Arc<dyn EventPublisher>,
}

impl<S: Store> Clone for ListService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S: Store> ListService<S> {
    pub fn new(store: Arc<S>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    pub async fn create(&self, user_id: Uuid, input: NewList) -> ServiceResult<List> {
        let title = required_text(&input.title, "Title")?;
        let board_id = input.board_id;
        board_for_member(self.store.as_ref(), board_id, user_id).await?;

        let list = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let position = next_position(uow.last_list_position(board_id).await?);
                    let list = uow
                        .insert_list(CreateList {
                            board_id,
                            title,
                            position,
                        })
                        .await?;
                    uow.record_activity(log_entry(
                        ActivityAction::ListCreated,
                        EntityType::List,
                        list.id,
                        json!({ "title": list.title }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(list)
                })
            })
            .await?;

        tracing::info!(list_id = %list.id, %board_id, position = list.position, "List created");
        broadcast(self.events.as_ref(), board_id, EventName::ListCreated, &list, user_id);
        Ok(list)
    }

    /// Title and/or position
    pub async fn update(&self, list_id: Uuid, user_id: Uuid, patch: ListPatch) -> ServiceResult<List> {
        let patch = ListPatch {
            title: patch
                .title
                .as_deref()
                .map(|t| required_text(t, "Title"))
                .transpose()?,
            position: patch.position.map(validate_position).transpose()?,
        };
        let list = self.authorized_list(list_id, user_id).await?;

        let updated = self
            .apply(list.board_id, list_id, user_id, patch, ActivityAction::ListUpdated)
            .await?;

        tracing::info!(%list_id, board_id = %list.board_id, "List updated");
        Ok(updated)
    }

    /// Moves a list to `position`; siblings keep their keys
    pub async fn reorder(&self, list_id: Uuid, user_id: Uuid, position: f64) -> ServiceResult<List> {
        let position = validate_position(position)?;
        let list = self.authorized_list(list_id, user_id).await?;

        let patch = ListPatch {
            title: None,
            position: Some(position),
        };
        let updated = self
            .apply(list.board_id, list_id, user_id, patch, ActivityAction::ListReordered)
            .await?;

        tracing::info!(%list_id, board_id = %list.board_id, position, "List reordered");
        Ok(updated)
    }

    /// Logs `LIST_DELETED`, then deletes the list and its tasks
    ///
    /// Returns the list as it was before deletion.
    pub async fn delete(&self, list_id: Uuid, user_id: Uuid) -> ServiceResult<List> {
        let list = self.authorized_list(list_id, user_id).await?;
        let board_id = list.board_id;
        let title = list.title.clone();

        self.store
            .transaction(move |uow| {
                Box::pin(async move {
                    uow.record_activity(log_entry(
                        ActivityAction::ListDeleted,
                        EntityType::List,
                        list_id,
                        json!({ "title": title }),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    if !uow.delete_list(list_id).await? {
                        return Err(ServiceError::ListNotFound);
                    }
                    Ok::<_, ServiceError>(())
                })
            })
            .await?;

        tracing::info!(%list_id, %board_id, "List deleted");
        broadcast(
            self.events.as_ref(),
            board_id,
            EventName::ListDeleted,
            &json!({ "listId": list_id, "boardId": board_id }),
            user_id,
        );
        Ok(list)
    }

    /// Resolves the list, then checks membership on its board
    async fn authorized_list(&self, list_id: Uuid, user_id: Uuid) -> ServiceResult<List> {
        let list = self
            .store
            .find_list(list_id)
            .await?
            .ok_or(ServiceError::ListNotFound)?;
        verify_membership(self.store.as_ref(), list.board_id, user_id).await?;
        Ok(list)
    }

    async fn apply(
        &self,
        board_id: Uuid,
        list_id: Uuid,
        user_id: Uuid,
        patch: ListPatch,
        action: ActivityAction,
    ) -> ServiceResult<List> {
        let list = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    let list = uow
                        .update_list(list_id, &patch)
                        .await?
                        .ok_or(ServiceError::ListNotFound)?;
                    uow.record_activity(log_entry(
                        action,
                        EntityType::List,
                        list_id,
                        serde_json::to_value(&patch).unwrap_or_default(),
                        user_id,
                        board_id,
                    ))
                    .await?;
                    Ok::<_, ServiceError>(list)
                })
            })
            .await?;

        broadcast(self.events.as_ref(), board_id, EventName::ListUpdated, &list, user_id);
        Ok(list)
    }
}
