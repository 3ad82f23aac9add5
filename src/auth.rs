//! Credential store and session tokens
//!
//! Passwords are kept only as salted Argon2 hashes in a per-process map.
//! Sessions are HS256-signed JWTs carrying the username and an expiry; every
//! protected request re-validates the signature and expiry server-side.

use std::sync::OnceLock;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Name of the cookie that carries the session token.
pub const TOKEN_COOKIE: &str = "token";

static USERNAME: OnceLock<Regex> = OnceLock::new();

fn username_pattern() -> &'static Regex {
    USERNAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.@-]{1,64}$").expect("static regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AuthAction {
    Signup,
    Login,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Username may only contain letters, digits and . _ @ - (at most 64)")]
    InvalidUsername,

    #[error("Invalid action")]
    InvalidAction,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Missing session token")]
    MissingToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredentials | Self::InvalidUsername | Self::InvalidAction | Self::UserExists => 400,
            Self::InvalidCredentials | Self::InvalidToken(_) | Self::MissingToken => 401,
            Self::Hashing(_) | Self::Signing(_) => 500,
        }
    }

    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self.status_code() {
            400 => "BAD_REQUEST",
            401 => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show the caller.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidToken(_) => "Invalid or expired token".to_string(),
            Self::Hashing(_) | Self::Signing(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Token from an `Authorization` header value. The scheme name is matched
/// case-insensitively.
#[must_use]
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Session token from a raw `Cookie` header.
#[must_use]
pub fn cookie_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// In-memory username to password hash map.
#[derive(Default)]
pub struct CredentialStore {
    users: DashMap<String, String>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// Fails when either field is empty, the username is malformed or already
    /// taken, or hashing fails.
    pub fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        check_credentials(username, password)?;

        if self.users.contains_key(username) {
            return Err(AuthError::UserExists);
        }

        let hash = hash_password(password)?;

        // Re-checked under the shard lock; two concurrent signups for one
        // name must not both succeed.
        let Entry::Vacant(slot) = self.users.entry(username.to_string()) else {
            return Err(AuthError::UserExists);
        };
        slot.insert(hash);

        // Shard lock is released by now; len() takes every shard.
        tracing::info!("Registered user {username} ({} total)", self.len());
        Ok(())
    }

    /// Checks a username and password pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown user or a wrong password.
    pub fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        check_credentials(username, password)?;

        // Clone out so the shard lock is not held while hashing.
        let Some(stored) = self.users.get(username).map(|entry| entry.value().clone()) else {
            return Err(AuthError::InvalidCredentials);
        };

        let parsed = PasswordHash::new(&stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    fn len(&self) -> usize {
        self.users.len()
    }
}

fn check_credentials(
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if !username_pattern().is_match(username) {
        return Err(AuthError::InvalidUsername);
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Signs and validates session tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        secret: &[u8],
        ttl: Duration,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issues a token for `username`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if encoding fails.
    pub fn issue(
        &self,
        username: &str,
    ) -> Result<String, AuthError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = SessionClaims {
            sub: username.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };
        self.sign(&claims)
    }

    fn sign(
        &self,
        claims: &SessionClaims,
    ) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validates signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for a bad signature, malformed token or
    /// expired session.
    pub fn verify(
        &self,
        token: &str,
    ) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
