//! Quill Core - Domain models, storage traits, and shared types
//!
//! This crate defines the core abstractions used throughout Quill:
//! - User and post records
//! - Common error types
//! - Storage traits for users and posts (the credential store)
//! - In-memory and PostgreSQL store implementations
//! - Configuration management
//! - Seed data

pub mod config;
pub mod memory;
pub mod postgres;
pub mod seed;

pub use config::{
    ApiConfig, AppConfig, AuthConfig, ConfigError, DatabaseConfig, LogFormat, LoggingConfig,
    ServerConfig,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Quill operations
#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QuillError>;

// ============================================================================
// Records
// ============================================================================

/// A registered account
///
/// The password is only ever held as an Argon2id PHC string. It is never
/// serialized from this type; API responses go through an explicit view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user record with a fresh identifier
    pub fn new(username: impl Into<String>, password_digest: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_digest: password_digest.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A post, optionally attributed to a user
///
/// `user_id` is stored as supplied; nothing checks that it names an
/// existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(content: impl Into<String>, user_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Storage traits
// ============================================================================

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`QuillError::Conflict`] when the username is taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Exact-match lookup by username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// All users in creation order
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Remove every user (seeding only)
    async fn delete_all_users(&self) -> Result<u64>;
}

/// Post persistence
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: Post) -> Result<Post>;

    /// All posts in creation order, regardless of owner
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// Remove every post (seeding only)
    async fn delete_all_posts(&self) -> Result<u64>;
}

// ============================================================================
// Tests
// ============================================================================
