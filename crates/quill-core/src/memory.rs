//! In-memory store
//!
//! Backs both storage traits with insertion-ordered vectors behind async
//! read/write locks. Used by tests and by the server when no database URL
//! is configured.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Post, PostStore, QuillError, Result, User, UserStore};

/// Process-local store for users and posts
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(QuillError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let mut users = self.users.write().await;
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: Post) -> Result<Post> {
        self.posts.write().await.push(post.clone());
        Ok(post)
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.read().await.clone())
    }

    async fn delete_all_posts(&self) -> Result<u64> {
        let mut posts = self.posts.write().await;
        let removed = posts.len() as u64;
        posts.clear();
        Ok(removed)
    }
}
