//! HTTP request handlers

pub mod health;
pub mod posts;
pub mod sessions;
pub mod users;

pub use health::{health_check, prometheus_metrics};
pub use posts::{create_post, list_posts};
pub use sessions::login;
pub use users::{create_user, list_users};
