//! Authentication service layer
//!
//! Registration and login against the user store. Handlers stay thin and
//! translate the results into HTTP responses and audit events.

use super::jwt::{Claims, TokenCodec};
use super::password::{verify_password, Argon2Hasher};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use quill_core::{QuillError, User, UserStore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// User registration request
///
/// Missing fields deserialize as empty and fail validation, so every bad
/// input ends up as the same 422.
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "confirmation_matches"))]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,

    /// Checked only when supplied
    #[serde(default)]
    pub password_confirmation: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn confirmation_matches(request: &RegisterRequest) -> Result<(), ValidationError> {
    match &request.password_confirmation {
        Some(confirmation) if confirmation != &request.password => {
            Err(ValidationError::new("confirmation_mismatch"))
        }
        _ => Ok(()),
    }
}

/// User login request
#[derive(Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Public representation of a user
///
/// The digest is only present when the deployment opts in to exposing it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserView {
    pub fn from_user(user: &User, expose_digest: bool) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            password_digest: expose_digest.then(|| user.password_digest.clone()),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserView,
}

/// Successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserView,
    pub jwt_token: String,
}

/// Authentication service
///
/// Borrows the store, codec and hashing parameters from the application
/// state for the duration of one request.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    codec: &'a TokenCodec,
    password: &'a Argon2Hasher,
}

impl<'a> AuthService<'a> {
    pub fn new(users: &'a dyn UserStore, codec: &'a TokenCodec, password: &'a Argon2Hasher) -> Self {
        Self {
            users,
            codec,
            password,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(state.users.as_ref(), &state.codec, &state.password)
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - The stored user
    /// * `Err(AppError::Validation)` - Blank username, empty password,
    ///   mismatched confirmation or a taken username; nothing is stored
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        request
            .validate()
            .map_err(|e| AppError::Validation(describe(&e)))?;

        let digest = self
            .password
            .hash(&request.password)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let user = self
            .users
            .insert_user(User::new(request.username, digest))
            .await
            .map_err(|e| match e {
                QuillError::Conflict(msg) => AppError::Validation(msg),
                other => AppError::from(other),
            })?;

        Ok(user)
    }

    /// Check credentials and issue a token
    ///
    /// Unknown usernames and wrong passwords fail identically. An unknown
    /// username is still checked against the hasher's decoy digest so both
    /// failures cost one Argon2 verification.
    pub async fn login(&self, request: LoginRequest) -> Result<(User, String), AppError> {
        let found = self
            .users
            .find_user_by_username(&request.username)
            .await?;

        let Some(user) = found else {
            let _ = verify_password(&request.password, self.password.decoy_digest());
            return Err(AppError::InvalidCredentials);
        };

        let valid = verify_password(&request.password, &user.password_digest).unwrap_or_else(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password digest is unusable");
            false
        });

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Mint a token for a user without checking a password
    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        self.codec
            .encode(&Claims::for_user(user.id))
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Flatten validation errors into a log-friendly reason
fn describe(errors: &ValidationErrors) -> String {
    let mut reasons: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
            format!("{field}: {}", codes.join(","))
        })
        .collect();
    reasons.sort();
    reasons.join("; ")
}
