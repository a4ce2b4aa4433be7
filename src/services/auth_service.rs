//! Account registration, login and session renewal.
//!
//! All three entry points end in the same place: a fresh access + refresh pair and
//! the non-sensitive profile of the account.

use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        status::AuthProvider,
        user::{AuthResponse, LoginRequest, NewUser, RegisterRequest, User},
    },
    services::token_service::{TokenService, TokenType},
    store::{StoreError, UserStore},
    utils::hashing::SecretHasher,
};

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_FULL_NAME_CHARS: usize = 2;

/// Trim and lowercase an email at the API boundary.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: SecretHasher,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: SecretHasher, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Create a local account and sign it in.
    ///
    /// # Validation
    ///
    /// - email must contain `@`
    /// - password must be at least 8 characters
    /// - full name must be at least 2 characters
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: validation failed
    /// - `EmailExists`: the email is already registered, in any account state
    /// - `Generation`: hashing or token signing failed
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&request.email);
        let full_name = request.full_name.trim().to_string();

        if !email.contains('@') {
            return Err(AppError::InvalidRequest("Invalid email address".to_string()));
        }
        if request.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::InvalidRequest(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if full_name.chars().count() < MIN_FULL_NAME_CHARS {
            return Err(AppError::InvalidRequest(format!(
                "Full name must be at least {MIN_FULL_NAME_CHARS} characters"
            )));
        }

        if self.users.email_exists(&email).await? {
            return Err(AppError::EmailExists);
        }

        let password_hash = self.hasher.hash(&request.password)?;

        // A concurrent registration may still win the unique index
        let user = self
            .users
            .insert(NewUser {
                email,
                password_hash: Some(password_hash),
                full_name,
                provider: AuthProvider::Local,
                provider_id: None,
                is_verified: false,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::EmailExists,
                other => AppError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, "Account registered");

        self.sign_in(user)
    }

    /// Email + password login.
    ///
    /// Unknown email, an account without a password, and a wrong password all
    /// produce the same `InvalidCredentials` error.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let Some(password_hash) = user.password_hash.as_deref() else {
            tracing::debug!(user_id = %user.id, "Login rejected: account has no password");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(&request.password, password_hash) {
            tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "Login succeeded");

        self.sign_in(user)
    }

    /// Exchange a refresh token for a brand-new pair.
    ///
    /// The presented refresh token is not consumed and stays valid until it expires.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: token invalid, expired, or not a refresh token
    /// - `UserNotFound`: the subject no longer resolves to a live account
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let verified = self
            .tokens
            .verify(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Refresh token rejected");
                AppError::Unauthorized
            })?;

        let user = self
            .users
            .find_by_id(verified.user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        self.sign_in(user)
    }

    /// Sign in through a federated identity provider.
    ///
    /// # Resolution
    ///
    /// 1. Account already linked to this Google ID → use it
    /// 2. Account with the same email → link the Google ID to it
    /// 3. Otherwise → create a verified account with no password
    pub async fn federated_login(
        &self,
        email: &str,
        full_name: &str,
        provider_id: &str,
    ) -> Result<AuthResponse, AppError> {
        let email = normalize_email(email);

        if let Some(user) = self
            .users
            .find_by_provider(AuthProvider::Google, provider_id)
            .await?
        {
            return self.sign_in(user);
        }

        if let Some(existing) = self.users.find_by_email(&email).await? {
            let user = self
                .users
                .link_provider(existing.id, AuthProvider::Google, provider_id)
                .await?
                .ok_or(AppError::UserNotFound)?;

            tracing::info!(user_id = %user.id, "Federated identity linked");
            return self.sign_in(user);
        }

        let user = self
            .users
            .insert(NewUser {
                email,
                password_hash: None,
                full_name: full_name.trim().to_string(),
                provider: AuthProvider::Google,
                provider_id: Some(provider_id.to_string()),
                is_verified: true,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::EmailExists,
                other => AppError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, "Account created from federated login");

        self.sign_in(user)
    }

    fn sign_in(&self, user: User) -> Result<AuthResponse, AppError> {
        let pair = self
            .tokens
            .issue_pair(user.id, &user.email)
            .map_err(|e| AppError::Generation(e.to_string()))?;

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            user: user.into(),
        })
    }
}
