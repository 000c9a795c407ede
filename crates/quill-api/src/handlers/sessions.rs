//! Login handler

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthService, LoginRequest, LoginResponse, UserView};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Exchange a username and password for a token
///
/// Responds 202 with the user and a token for the `Authorization` header.
/// Unknown usernames, wrong passwords and unreadable bodies get the same 401.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 202, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = crate::error::MessageBody),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            audit_log(&AuditEvent::LoginFailure {
                username: String::new(),
                reason: rejection.body_text(),
                ip_address,
                user_agent,
            });
            return Err(AppError::InvalidCredentials);
        }
    };
    let username = request.username.clone();

    let (user, token) = match AuthService::from_state(&state).login(request).await {
        Ok(result) => result,
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                username,
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            return Err(e);
        }
    };

    audit_log(&AuditEvent::LoginSuccess {
        user_id: user.id,
        username: user.username.clone(),
        ip_address,
        user_agent,
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(LoginResponse {
            user: UserView::from_user(&user, state.expose_password_digest()),
            jwt_token: token,
        }),
    ))
}
