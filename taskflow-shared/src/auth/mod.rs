/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the signup password policy
/// - [`jwt`]: Access/refresh token issue and verification
/// - [`middleware`]: Bearer extraction and the Axum auth layer
/// - [`authorization`]: Board membership and ownership checks
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::auth::jwt::TokenSettings;
/// use taskflow_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ng!Pass")?;
/// assert!(verify_password("Str0ng!Pass", &hash)?);
///
/// let tokens = TokenSettings::new("access-secret", "refresh-secret");
/// let pair = tokens.issue_pair(Uuid::new_v4(), "ada@example.com")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
