/// Accounts and sessions
///
/// A session is the user's public profile plus an access/refresh token pair.
/// Access tokens verify offline; a refresh additionally confirms the account
/// still exists.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use validator::ValidateEmail;

use super::required_text;
use crate::auth::jwt::{TokenPair, TokenSettings};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, CreateUser, User, UserSummary};
use crate::store::{Store, StoreError, UnitOfWork};

/// Maximum results for the member picker
pub const USER_SEARCH_LIMIT: i64 = 10;

/// Signup input
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Authenticated session handed back on signup, login and refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

pub struct IdentityService<S: Store> {
    store: Arc<S>,
    tokens: Arc<TokenSettings>,
}

impl<S: Store> Clone for IdentityService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<S: Store> IdentityService<S> {
    pub fn new(store: Arc<S>, tokens: Arc<TokenSettings>) -> Self {
        Self { store, tokens }
    }

    /// Creates an account and opens a session
    pub async fn signup(&self, input: Signup) -> ServiceResult<Session> {
        let name = required_text(&input.name, "Name")?;
        let email = normalize_email(&input.email);
        if !email.validate_email() {
            return Err(ServiceError::invalid("Invalid email format"));
        }
        validate_password_strength(&input.password).map_err(ServiceError::InvalidInput)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateIdentity);
        }

        let password_hash =
            hash_password(&input.password).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let data = CreateUser {
            email,
            name,
            password_hash,
        };
        let user = self
            .store
            .transaction(move |uow| {
                Box::pin(async move {
                    // a concurrent signup can still win the race to the unique index
                    let user = uow.insert_user(data).await.map_err(|e| match e {
                        StoreError::UniqueViolation(_) => ServiceError::DuplicateIdentity,
                        other => other.into(),
                    })?;
                    Ok::<_, ServiceError>(user)
                })
            })
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");
        self.session(user)
    }

    /// Exchanges credentials for a session
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid = verify_password(password, &user.password_hash).map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            ServiceError::InvalidCredentials
        })?;
        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    /// Trades a refresh token for a fresh pair
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<Session> {
        let claims = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            ServiceError::InvalidToken
        })?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        self.session(user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Name or email substring match, excluding the caller
    pub async fn search_users(&self, query: &str, user_id: Uuid) -> ServiceResult<Vec<UserSummary>> {
        Ok(self
            .store
            .search_users(query.trim(), user_id, USER_SEARCH_LIMIT)
            .await?)
    }

    fn session(&self, user: User) -> ServiceResult<Session> {
        let tokens = self
            .tokens
            .issue_pair(user.id, &user.email)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Session { user, tokens })
    }
}
