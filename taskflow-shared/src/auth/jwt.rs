/// JWT token generation and validation module
///
/// Access and refresh tokens are signed with HS256 using two separate
/// secrets, so a leaked refresh secret cannot mint access tokens and vice
/// versa. Access tokens are verified without touching the database.
///
/// # Token Types
///
/// - **Access Token**: Short-lived (15 minutes by default), sent as a bearer token
/// - **Refresh Token**: Long-lived (7 days by default), exchanged for a new pair
///
/// # Example
///
/// ```
/// use taskflow_shared::auth::jwt::TokenSettings;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = TokenSettings::new(
///     "access-secret-at-least-32-bytes-long!!",
///     "refresh-secret-at-least-32-bytes-long!",
/// );
///
/// let user_id = Uuid::new_v4();
/// let pair = settings.issue_pair(user_id, "ada@example.com")?;
///
/// let claims = settings.verify_access(&pair.access_token)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim on every token
pub const ISSUER: &str = "taskflow";

/// Default access token lifetime in seconds
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 900;

/// Default refresh token lifetime in seconds
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 604_800;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Valid token of the other kind
    #[error("Expected {expected} token")]
    WrongTokenType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "taskflow")
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Custom Claims
///
/// - `email`: Account email at issue time
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims that expire `ttl` from now
    pub fn new(user_id: Uuid, email: impl Into<String>, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + ttl;

        Self {
            sub: user_id,
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret. The secret should
/// be at least 32 bytes and come from the environment, never from source.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies the signature, expiry, not-before time and issuer. Does not look
/// at the token type; use [`validate_access_token`] or
/// [`validate_refresh_token`] for that.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh.as_str(),
        });
    }

    Ok(claims)
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signing keys and lifetimes for both token kinds
#[derive(Debug, Clone)]
pub struct TokenSettings {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSettings {
    /// Settings with the default lifetimes (15 minutes / 7 days)
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Signs a fresh access/refresh pair for `user_id`
    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, JwtError> {
        let access = Claims::new(user_id, email, TokenType::Access, self.access_ttl);
        let refresh = Claims::new(user_id, email, TokenType::Refresh, self.refresh_ttl);

        Ok(TokenPair {
            access_token: create_token(&access, &self.access_secret)?,
            refresh_token: create_token(&refresh, &self.refresh_secret)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        validate_access_token(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        validate_refresh_token(token, &self.refresh_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "test-access-secret-at-least-32-bytes";
    const REFRESH: &str = "test-refresh-secret-at-least-32-bytes";

    fn settings() -> TokenSettings {
        TokenSettings::new(ACCESS, REFRESH)
    }

    #[test]
    fn test_default_lifetimes() {
        let settings = settings();
        assert_eq!(settings.access_ttl(), Duration::minutes(15));
        assert_eq!(settings.refresh_ttl(), Duration::days(7));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, "ada@example.com", TokenType::Access, Duration::hours(1));

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.iss, "taskflow");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());

        let time_left = claims.time_until_expiration().unwrap();
        assert!(time_left.num_seconds() > 3500);
        assert!(time_left.num_seconds() <= 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "a@b.co", TokenType::Access, Duration::minutes(5));
        let token = create_token(&claims, ACCESS).expect("Should create token");

        let validated = validate_token(&token, ACCESS).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.iss, "taskflow");
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), "a@b.co", TokenType::Access, Duration::minutes(5));
        let token = create_token(&claims, ACCESS).expect("Should create token");

        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        // Expired an hour ago, well past the default leeway
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@b.co",
            TokenType::Access,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());
        assert!(claims.time_until_expiration().is_none());

        let token = create_token(&claims, ACCESS).expect("Should create token");
        let result = validate_token(&token, ACCESS);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_issue_pair_uses_separate_secrets() {
        let settings = settings();
        let user_id = Uuid::new_v4();
        let pair = settings.issue_pair(user_id, "a@b.co").unwrap();

        assert_eq!(pair.expires_in, 900);
        assert_eq!(settings.verify_access(&pair.access_token).unwrap().sub, user_id);
        assert_eq!(settings.verify_refresh(&pair.refresh_token).unwrap().sub, user_id);

        // Each token is only valid under its own secret and type
        assert!(settings.verify_access(&pair.refresh_token).is_err());
        assert!(settings.verify_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_token_type_is_enforced() {
        let claims = Claims::new(Uuid::new_v4(), "a@b.co", TokenType::Refresh, Duration::minutes(5));
        let token = create_token(&claims, ACCESS).unwrap();

        assert!(matches!(
            validate_access_token(&token, ACCESS),
            Err(JwtError::WrongTokenType { expected: "access" })
        ));
        assert!(validate_refresh_token(&token, ACCESS).is_ok());
    }
}
