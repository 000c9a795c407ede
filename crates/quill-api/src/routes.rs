//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{posts, sessions, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the resource routes
///
/// Registration and login are public; everything else passes the request
/// gate first. Both routers register `/users`, and `merge` combines the
/// methods so only `GET /users` is gated.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/login", post(sessions::login));

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
