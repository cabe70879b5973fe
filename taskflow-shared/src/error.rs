/// Error taxonomy for domain operations
///
/// Every precondition failure is reported as a distinct [`ServiceError`]
/// variant and aborts the enclosing unit of work before anything commits.

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    // authentication
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    DuplicateIdentity,

    #[error("Invalid or expired token")]
    InvalidToken,

    // authorization
    #[error("You are not a member of this board")]
    NotAMember,

    #[error("Only the board owner can perform this action")]
    NotOwner,

    #[error("The board owner cannot remove themselves")]
    CannotRemoveSelf,

    #[error("User is already a member of this board")]
    AlreadyMember,

    // not found
    #[error("Board not found")]
    BoardNotFound,

    #[error("List not found")]
    ListNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Target list not found")]
    TargetListNotFound,

    #[error("User not found")]
    UserNotFound,

    // validation
    #[error("{0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    /// Short stable code for logs and error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::DuplicateIdentity => "duplicate_identity",
            ServiceError::InvalidToken => "invalid_token",
            ServiceError::NotAMember => "not_a_member",
            ServiceError::NotOwner => "not_owner",
            ServiceError::CannotRemoveSelf => "cannot_remove_self",
            ServiceError::AlreadyMember => "already_member",
            ServiceError::BoardNotFound => "board_not_found",
            ServiceError::ListNotFound => "list_not_found",
            ServiceError::TaskNotFound => "task_not_found",
            ServiceError::TargetListNotFound => "target_list_not_found",
            ServiceError::UserNotFound => "user_not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Internal(_) => "internal_error",
            ServiceError::Store(_) => "internal_error",
        }
    }
}

impl From<crate::ordering::PositionError> for ServiceError {
    fn from(err: crate::ordering::PositionError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}
