//! Post handlers

use crate::auth::CurrentUser;
use crate::error::{AppError, JsonBody};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use quill_core::Post;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Envelope for post creation: `{ "post": { ... } }`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub post: Option<PostParams>,
}

/// Permitted post attributes; anything else is ignored
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PostParams {
    #[serde(default)]
    pub content: Option<String>,
    /// Stored as given; not checked against existing users
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl PostParams {
    fn is_empty(&self) -> bool {
        self.content.is_none() && self.user_id.is_none()
    }
}

/// List every post, regardless of owner
#[utoipa::path(
    get,
    path = "/posts",
    tag = "posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All posts", body = Vec<Post>),
        (status = 401, description = "Missing or invalid token", body = crate::error::MessageBody),
    )
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(caller = %caller.id, "Listing posts");

    let posts = state.posts.list_posts().await?;
    Ok(Json(posts))
}

/// Create a post
#[utoipa::path(
    post,
    path = "/posts",
    tag = "posts",
    security(("bearer_auth" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Missing or unreadable post parameters", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::MessageBody),
    )
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    JsonBody(request): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let params = request
        .post
        .filter(|params| !params.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("param is missing or the value is empty: post".to_string())
        })?;

    let post = state
        .posts
        .insert_post(Post::new(params.content.unwrap_or_default(), params.user_id))
        .await?;

    tracing::info!(post_id = %post.id, caller = %caller.id, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}
