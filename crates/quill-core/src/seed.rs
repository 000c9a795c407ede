//! Seed data
//!
//! Clears both stores and loads five users with four posts each.

use tracing::info;

use crate::{Post, PostStore, Result, User, UserStore};

/// Usernames created by [`run`], in order
pub const SEED_USERNAMES: [&str; 5] = ["user1", "user2", "user3", "user4", "user5"];

/// Post bodies created by [`run`]; consecutive groups of four belong to one user
pub const SEED_POSTS: [&str; 20] = [
    "First post",
    "Second post",
    "Third post",
    "Fourth post",
    "Fifth post",
    "Sixth post",
    "Seventh post",
    "Eighth post",
    "Ninth post",
    "Tenth post",
    "Eleventh post",
    "Twelfth post",
    "Thirteenth post",
    "Fourteenth post",
    "Fifteenth post",
    "Sixteenth post",
    "Seventeenth post",
    "Eighteenth post",
    "Nineteenth post",
    "Twentieth post",
];

const POSTS_PER_USER: usize = 4;

/// Summary of a seeding run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub users_removed: u64,
    pub posts_removed: u64,
    pub users_created: usize,
    pub posts_created: usize,
}

/// Reset the stores and load the seed data
///
/// Every seed user shares `password_digest`; callers hash the seed password
/// once and pass the digest in.
pub async fn run(
    users: &dyn UserStore,
    posts: &dyn PostStore,
    password_digest: &str,
) -> Result<SeedReport> {
    info!("Clearing database...");
    let posts_removed = posts.delete_all_posts().await?;
    let users_removed = users.delete_all_users().await?;

    info!("Seeding users...");
    let mut created = Vec::with_capacity(SEED_USERNAMES.len());
    for username in SEED_USERNAMES {
        created.push(users.insert_user(User::new(username, password_digest)).await?);
    }

    info!("Seeding posts...");
    for (index, content) in SEED_POSTS.iter().enumerate() {
        let owner = &created[index / POSTS_PER_USER];
        posts.insert_post(Post::new(*content, Some(owner.id))).await?;
    }

    info!(
        users = created.len(),
        posts = SEED_POSTS.len(),
        "Seeding complete"
    );

    Ok(SeedReport {
        users_removed,
        posts_removed,
        users_created: created.len(),
        posts_created: SEED_POSTS.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_seed_assigns_four_posts_per_user() {
        let store = MemoryStore::new();
        let report = run(&store, &store, "digest").await.unwrap();

        assert_eq!(report.users_created, 5);
        assert_eq!(report.posts_created, 20);

        let users = store.list_users().await.unwrap();
        let posts = store.list_posts().await.unwrap();

        for (i, user) in users.iter().enumerate() {
            let owned: Vec<_> = posts
                .iter()
                .filter(|p| p.user_id == Some(user.id))
                .map(|p| p.content.as_str())
                .collect();
            assert_eq!(owned, SEED_POSTS[i * 4..i * 4 + 4].to_vec());
        }
    }

    #[tokio::test]
    async fn test_seed_clears_existing_rows() {
        let store = MemoryStore::new();
        store.insert_user(User::new("stale", "x")).await.unwrap();
        store.insert_post(Post::new("stale", None)).await.unwrap();

        let report = run(&store, &store, "digest").await.unwrap();
        assert_eq!(report.users_removed, 1);
        assert_eq!(report.posts_removed, 1);
        assert!(store.find_user_by_username("stale").await.unwrap().is_none());

        // Running twice must not trip the username uniqueness check
        run(&store, &store, "digest").await.unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 5);
    }
}
