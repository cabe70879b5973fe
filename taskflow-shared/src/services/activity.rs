/// Activity log queries
///
/// Entries are only ever written by the other services, inside the same
/// transaction as the change they describe. This service is the read side.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::authorization::board_for_member;
use crate::error::ServiceResult;
use crate::models::activity::ActivityView;
use crate::pagination::{PageRequest, Pagination};
use crate::store::Store;

/// One page of a board's activity, newest first
#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub activities: Vec<ActivityView>,
    pub pagination: Pagination,
}

pub struct ActivityService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for ActivityService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> ActivityService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn query(&self, board_id: Uuid, user_id: Uuid, page: PageRequest) -> ServiceResult<ActivityPage> {
        board_for_member(self.store.as_ref(), board_id, user_id).await?;

        let total = self.store.count_board_activity(board_id).await?;
        let activities = self
            .store
            .board_activity(board_id, page.offset(), page.limit)
            .await?;

        Ok(ActivityPage {
            activities,
            pagination: Pagination::new(page, total),
        })
    }
}
