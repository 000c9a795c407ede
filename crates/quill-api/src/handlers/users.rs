//! User handlers
//!
//! Registration is open; listing requires a valid token.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthService, CurrentUser, RegisterRequest, RegisterResponse, UserView};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserView>),
        (status = 401, description = "Missing or invalid token", body = crate::error::MessageBody),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(caller = %caller.id, "Listing users");

    let expose = state.expose_password_digest();
    let users: Vec<UserView> = state
        .users
        .list_users()
        .await?
        .iter()
        .map(|user| UserView::from_user(user, expose))
        .collect();

    Ok(Json(users))
}

/// Register a new user
///
/// Every rejection (blank username, empty password, mismatched
/// confirmation, taken username, unreadable body) produces the same 422 body.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 422, description = "User could not be created", body = crate::error::ErrorBody),
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let e = AppError::Validation(rejection.body_text());
            audit_log(&AuditEvent::RegistrationFailure {
                username: String::new(),
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            return Err(e);
        }
    };
    let username = request.username.clone();

    let user = match AuthService::from_state(&state).register(request).await {
        Ok(user) => user,
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                username,
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            return Err(e);
        }
    };

    audit_log(&AuditEvent::Registration {
        user_id: user.id,
        username: user.username.clone(),
        ip_address,
        user_agent,
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserView::from_user(&user, state.expose_password_digest()),
        }),
    ))
}
