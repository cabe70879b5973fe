/// Board membership guard
///
/// Every board-scoped operation passes through [`verify_membership`] with the
/// board the target entity actually belongs to. For lists and tasks the
/// caller resolves the entity first and uses its board id, never one supplied
/// by the client.
///
/// Destructive board operations additionally require ownership
/// ([`require_owner`]).

use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::board::Board;
use crate::models::member::BoardMember;
use crate::store::Store;

/// Returns the caller's membership, or `NotAMember`
pub async fn verify_membership<S: Store>(
    store: &S,
    board_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<BoardMember> {
    store
        .find_membership(board_id, user_id)
        .await?
        .ok_or(ServiceError::NotAMember)
}

/// Loads a board, failing with `BoardNotFound` before checking membership
pub async fn board_for_member<S: Store>(
    store: &S,
    board_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<(Board, BoardMember)> {
    let board = store
        .find_board(board_id)
        .await?
        .ok_or(ServiceError::BoardNotFound)?;
    let membership = verify_membership(store, board_id, user_id).await?;
    Ok((board, membership))
}

/// Owner check for delete and member removal
pub fn require_owner(board: &Board, user_id: Uuid) -> ServiceResult<()> {
    if board.owner_id != user_id {
        return Err(ServiceError::NotOwner);
    }
    Ok(())
}
