//! Request gate for protected routes
//!
//! Resolves the caller's identity from the `Authorization` header in four
//! steps (header, token, claims, user) and rejects the request with a
//! uniform 401 if any step fails. Each step is computed at most once per
//! request and cached in a [`RequestAuth`] that handlers can read back from
//! the request extensions.
//!
//! The gate does not know which routes are public; that is decided by where
//! the router attaches it.

use super::jwt::{Claims, DecodeError, TokenCodec};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::MessageBody;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use quill_core::{User, UserStore};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::warn;

/// Body message for every gate rejection
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in";

/// Why the gate refused a request
///
/// All variants produce the same response; the distinction only reaches
/// the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Authorization header carries no token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] DecodeError),

    #[error("Token does not belong to a known user")]
    UnknownUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(MessageBody::new(LOGIN_REQUIRED_MESSAGE)),
        )
            .into_response()
    }
}

/// The user resolved by the gate
///
/// Inserted into request extensions; extract it in handlers with
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Per-request authentication context
///
/// Holds the raw header and lazily computed token, claims and user. Nothing
/// here outlives the request it was built from.
#[derive(Debug, Default)]
pub struct RequestAuth {
    auth_header: Option<String>,
    token: OnceLock<Option<String>>,
    claims: OnceLock<Result<Claims, DecodeError>>,
    user: OnceCell<Option<User>>,
}

impl RequestAuth {
    /// Capture the `Authorization` header
    ///
    /// A header that is not visible ASCII is treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            auth_header: headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            ..Self::default()
        }
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Second whitespace-separated segment of the header; the scheme is ignored
    pub fn header_token(&self) -> Option<&str> {
        self.token
            .get_or_init(|| {
                self.auth_header
                    .as_deref()
                    .and_then(|value| value.split_whitespace().nth(1))
                    .map(str::to_owned)
            })
            .as_deref()
    }

    /// Verified claims carried by the token
    pub fn decoded_token(&self, codec: &TokenCodec) -> Result<&Claims, AuthError> {
        self.auth_header().ok_or(AuthError::MissingAuthHeader)?;
        let token = self.header_token().ok_or(AuthError::MissingToken)?;

        self.claims
            .get_or_init(|| codec.decode(token))
            .as_ref()
            .map_err(|e| AuthError::InvalidToken(*e))
    }

    /// The user the token was issued to
    ///
    /// A failing store lookup counts as an unknown user: the request is
    /// rejected, not errored.
    pub async fn current_user(
        &self,
        codec: &TokenCodec,
        users: &dyn UserStore,
    ) -> Result<&User, AuthError> {
        let user_id = self.decoded_token(codec)?.user_id;

        self.user
            .get_or_init(|| async move {
                match users.find_user_by_id(user_id).await {
                    Ok(user) => user,
                    Err(e) => {
                        warn!(%user_id, error = %e, "User lookup failed during authorization");
                        None
                    }
                }
            })
            .await
            .as_ref()
            .ok_or(AuthError::UnknownUser)
    }
}

/// Authentication middleware that requires a valid token for an existing user
///
/// On success the request carries [`CurrentUser`] and `Arc<RequestAuth>` in
/// its extensions. On failure the handler never runs.
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use quill_api::auth::middleware::auth_middleware;
///
/// let protected = Router::new()
///     .route("/posts", get(list_posts))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = Arc::new(RequestAuth::from_headers(request.headers()));

    let user = match auth.current_user(&state.codec, state.users.as_ref()).await {
        Ok(user) => user.clone(),
        Err(e) => {
            audit_log(&AuditEvent::AccessDenied {
                method: request.method().to_string(),
                path: request.uri().path().to_string(),
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(e);
        }
    };

    request.extensions_mut().insert(CurrentUser(user));
    request.extensions_mut().insert(auth);

    Ok(next.run(request).await)
}
