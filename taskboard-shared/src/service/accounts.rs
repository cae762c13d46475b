//! Account service: registration, login, token refresh, and user lookups

use super::error::{bounded, ServiceError};
use crate::auth::jwt::{create_token, validate_refresh_token, Claims, TokenType};
use crate::auth::password::{hash_password, verify_password, HashCost};
use crate::models::{CreateUser, Role, User};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration input, password in plaintext
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,

    /// Defaults to `member`
    pub role: Option<Role>,
}

/// Tokens issued on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    hash_cost: HashCost,
    timeout: Duration,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: String, timeout: Duration) -> Self {
        Self {
            store,
            jwt_secret,
            hash_cost: HashCost::Standard,
            timeout,
        }
    }

    /// Overrides the Argon2 cost profile
    pub fn with_hash_cost(mut self, hash_cost: HashCost) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// `AlreadyExists("email")` when a live account uses the email, in any case.
    pub async fn register(&self, registration: Registration) -> Result<User, ServiceError> {
        let email = registration.email.trim().to_string();
        let name = registration.name.trim().to_string();

        let mut errors = Vec::new();
        if !email.contains('@') {
            errors.push(super::FieldError::new("email", "must be a valid email address"));
        }
        if name.is_empty() {
            errors.push(super::FieldError::new("name", "must not be empty"));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(super::FieldError::new(
                "password",
                "must be at least 8 characters",
            ));
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        if bounded(self.timeout, self.store.find_user_by_email(&email))
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyExists("email".to_string()));
        }

        let password_hash = hash_password(&registration.password, self.hash_cost)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let user = bounded(
            self.timeout,
            self.store.create_user(CreateUser {
                email,
                password_hash,
                name,
                role: registration.role.unwrap_or_default(),
            }),
        )
        .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Checks credentials and issues an access/refresh token pair
    ///
    /// An unknown email and a wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let user = bounded(self.timeout, self.store.find_user_by_email(email.trim()))
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "stored password hash is unreadable");
                return Err(ServiceError::InvalidCredentials);
            }
        }

        let token = self.issue(&user, TokenType::Access)?;
        let refresh_token = self.issue(&user, TokenType::Refresh)?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(Session {
            token,
            refresh_token,
            user,
        })
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The new token carries the account's current role.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ServiceError> {
        let claims = validate_refresh_token(refresh_token, &self.jwt_secret)
            .map_err(|e| ServiceError::Unauthenticated(e.to_string()))?;

        let user = bounded(self.timeout, self.store.find_user(claims.sub))
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("account no longer exists".to_string()))?;

        self.issue(&user, TokenType::Access)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, ServiceError> {
        bounded(self.timeout, self.store.find_user(user_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        bounded(self.timeout, self.store.list_users()).await
    }

    fn issue(&self, user: &User, token_type: TokenType) -> Result<String, ServiceError> {
        create_token(&Claims::new(user.id, user.role, token_type), &self.jwt_secret)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_access_token;
    use crate::store::MemoryStore;

    const SECRET: &str = "accounts-test-secret-of-32-bytes!";

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryStore::new()),
            SECRET.to_string(),
            Duration::from_secs(5),
        )
        .with_hash_cost(HashCost::Minimal)
    }

    fn registration(email: &str, role: Option<Role>) -> Registration {
        Registration {
            email: email.to_string(),
            password: "password123".to_string(),
            name: "Test User".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_member() {
        let accounts = service();
        let user = accounts
            .register(registration("new@taskboard.local", None))
            .await
            .unwrap();

        assert_eq!(user.role, Role::Member);
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let accounts = service();
        accounts
            .register(registration("dup@taskboard.local", None))
            .await
            .unwrap();

        let err = accounts
            .register(registration("DUP@taskboard.local", Some(Role::Admin)))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::AlreadyExists("email".to_string()));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let accounts = service();
        let err = accounts
            .register(Registration {
                email: "nope".to_string(),
                password: "short".to_string(),
                name: " ".to_string(),
                role: None,
            })
            .await
            .unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["email", "name", "password"]);
    }

    #[tokio::test]
    async fn test_login_issues_tokens_with_role() {
        let accounts = service();
        let user = accounts
            .register(registration("boss@taskboard.local", Some(Role::Manager)))
            .await
            .unwrap();

        let session = accounts
            .login("boss@taskboard.local", "password123")
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);

        let claims = validate_access_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Manager);

        let refreshed = accounts.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(validate_access_token(&refreshed, SECRET).unwrap().sub, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let accounts = service();
        accounts
            .register(registration("someone@taskboard.local", None))
            .await
            .unwrap();

        assert_eq!(
            accounts
                .login("someone@taskboard.local", "wrong-password")
                .await
                .unwrap_err(),
            ServiceError::InvalidCredentials
        );
        assert_eq!(
            accounts
                .login("nobody@taskboard.local", "password123")
                .await
                .unwrap_err(),
            ServiceError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let accounts = service();
        accounts
            .register(registration("r@taskboard.local", None))
            .await
            .unwrap();
        let session = accounts.login("r@taskboard.local", "password123").await.unwrap();

        assert!(matches!(
            accounts.refresh(&session.token).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_of_unknown_user() {
        let accounts = service();
        let id = Uuid::new_v4();
        assert_eq!(
            accounts.profile(id).await.unwrap_err(),
            ServiceError::not_found("user", id)
        );
    }
}
