/// Domain services
///
/// Every mutating operation follows the same shape:
///
/// 1. resolve the target entity and the board it belongs to
/// 2. authorize against that board (membership, or ownership for destructive
///    board operations)
/// 3. apply the change and its activity entry in one [`Store::transaction`]
/// 4. after commit, hand a [`BoardEvent`] to the [`EventPublisher`]
///
/// Any failure in steps 1 to 3 aborts before anything is written. Step 4 never
/// fails the operation.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskflow_shared::auth::jwt::TokenSettings;
/// use taskflow_shared::realtime::{ConnectionRegistry, LocalPublisher};
/// use taskflow_shared::services::Services;
/// use taskflow_shared::store::MemoryStore;
///
/// let registry = ConnectionRegistry::new();
/// let services = Services::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(TokenSettings::new("access-secret", "refresh-secret")),
///     Arc::new(LocalPublisher::new(registry)),
/// );
/// ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::jwt::TokenSettings;
use crate::models::activity::{ActivityAction, CreateActivity, EntityType};
use crate::realtime::{BoardEvent, EventName, EventPublisher};
use crate::store::Store;

pub mod activity;
pub mod boards;
pub mod identity;
pub mod lists;
pub mod tasks;

pub use activity::{ActivityPage, ActivityService};
pub use boards::{BoardService, NewBoard};
pub use identity::{IdentityService, Session, Signup};
pub use lists::{ListService, NewList};
pub use tasks::{NewTask, TaskSearchPage, TaskService, TaskUpdate};

/// All services over one store and one publisher
pub struct Services<S: Store> {
    pub identity: IdentityService<S>,
    pub boards: BoardService<S>,
    pub lists: ListService<S>,
    pub tasks: TaskService<S>,
    pub activity: ActivityService<S>,
}

impl<S: Store> Services<S> {
    pub fn new(store: Arc<S>, tokens: Arc<TokenSettings>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            identity: IdentityService::new(store.clone(), tokens),
            boards: BoardService::new(store.clone(), events.clone()),
            lists: ListService::new(store.clone(), events.clone()),
            tasks: TaskService::new(store.clone(), events),
            activity: ActivityService::new(store),
        }
    }
}

/// Shorthand for an activity row
pub(crate) fn log_entry(
    action: ActivityAction,
    entity_type: EntityType,
    entity_id: Uuid,
    details: Value,
    user_id: Uuid,
    board_id: Uuid,
) -> CreateActivity {
    CreateActivity {
        action,
        entity_type,
        entity_id,
        details,
        user_id,
        board_id,
    }
}

/// Publishes a committed change; serialization failures are logged
pub(crate) fn broadcast<T: Serialize>(
    events: &dyn EventPublisher,
    board_id: Uuid,
    event: EventName,
    data: &T,
    actor: Uuid,
) {
    match serde_json::to_value(data) {
        Ok(data) => events.publish(BoardEvent::new(board_id, event, data, actor)),
        Err(e) => tracing::error!(error = %e, %event, %board_id, "Failed to encode event payload"),
    }
}

/// Trimmed non-empty text or `InvalidInput`
pub(crate) fn required_text(value: &str, field: &str) -> crate::error::ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
