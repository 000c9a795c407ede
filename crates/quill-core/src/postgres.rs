//! PostgreSQL store
//!
//! Provides user and post persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::{DatabaseConfig, Post, PostStore, QuillError, Result, User, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY,
        content TEXT NOT NULL DEFAULT '',
        user_id UUID,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| QuillError::ConfigError("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(|e| QuillError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| QuillError::DatabaseError(format!("Schema migration failed: {e}")))?;
        }
        info!("Database schema is up to date");
        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_digest: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_digest: row.password_digest,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Post row from database
#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    content: String,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            content: row.content,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, password_digest, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, password_digest, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => QuillError::Conflict(
                format!("username '{}' is already taken", user.username),
            ),
            other => QuillError::DatabaseError(format!("Failed to create user: {other}")),
        })?;

        Ok(row.into())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_digest, created_at, updated_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_digest, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, password_digest, created_at, updated_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::DatabaseError(format!("Failed to list users: {e}")))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| QuillError::DatabaseError(format!("Failed to clear users: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: Post) -> Result<Post> {
        let row: PostRow = sqlx::query_as(
            r#"
            INSERT INTO posts (id, content, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, content, user_id, created_at, updated_at
            "#,
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(post.user_id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| QuillError::DatabaseError(format!("Failed to create post: {e}")))?;

        Ok(row.into())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            "SELECT id, content, user_id, created_at, updated_at FROM posts ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::DatabaseError(format!("Failed to list posts: {e}")))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn delete_all_posts(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts")
            .execute(&self.pool)
            .await
            .map_err(|e| QuillError::DatabaseError(format!("Failed to clear posts: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> PgStore {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL").ok(),
            max_connections: 2,
        };
        let store = PgStore::connect(&config).await.expect("connect");
        store.migrate().await.expect("migrate");
        store
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_user_round_trip() {
        let store = test_store().await;
        let username = format!("pg-{}", Uuid::new_v4());
        let user = store
            .insert_user(User::new(username.clone(), "digest"))
            .await
            .unwrap();

        let found = store.find_user_by_username(&username).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let duplicate = store.insert_user(User::new(username, "other")).await;
        assert!(matches!(duplicate, Err(QuillError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_post_without_owner() {
        let store = test_store().await;
        let post = store.insert_post(Post::new("orphan", None)).await.unwrap();

        let posts = store.list_posts().await.unwrap();
        assert!(posts.iter().any(|p| p.id == post.id && p.user_id.is_none()));
    }
}
