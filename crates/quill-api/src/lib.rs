//! Quill API - JSON server for users and posts
//!
//! Registration and login are open; listing users and reading or writing
//! posts require a token issued by `POST /login`.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use quill_core::{AppConfig, LogFormat, LoggingConfig, MemoryStore, PgStore};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for every route
#[derive(OpenApi)]
#[openapi(
    info(title = "Quill API", description = "Users, posts and token login"),
    paths(
        handlers::health::health_check,
        handlers::health::prometheus_metrics,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::posts::list_posts,
        handlers::posts::create_post,
        handlers::sessions::login,
    ),
    components(schemas(
        quill_core::Post,
        auth::RegisterRequest,
        auth::RegisterResponse,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::UserView,
        handlers::posts::CreatePostRequest,
        handlers::posts::PostParams,
        handlers::health::HealthResponse,
        error::MessageBody,
        error::ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "users", description = "Registration and user listing"),
        (name = "posts", description = "Posts"),
        (name = "health", description = "Liveness and metrics"),
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .merge(routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router over a fresh in-memory test state
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::for_testing());
    (create_router(state.clone()), state)
}

/// Permissive when no origins are configured; invalid entries are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "quill_api={level},quill_core={level},tower_http={level},audit=info",
            level = logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Connect the configured store and build the application state
///
/// Without `DATABASE_URL` the server runs on an in-memory store that is lost
/// on restart.
pub async fn build_state(config: AppConfig) -> anyhow::Result<Arc<AppState>> {
    let state = match config.database.url.as_deref() {
        Some(_) => {
            let store = Arc::new(
                PgStore::connect(&config.database)
                    .await
                    .context("Failed to connect to database")?,
            );
            store.migrate().await.context("Failed to prepare schema")?;
            tracing::info!("Using PostgreSQL store");
            AppState::new(config, store.clone(), store)?
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            let store = Arc::new(MemoryStore::new());
            AppState::new(config, store.clone(), store)?
        }
    };

    if state.expose_password_digest() {
        tracing::warn!("Password digests are included in user responses");
    }

    Ok(Arc::new(state))
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.server.bind_address();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Quill API listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in ["/users", "/posts", "/login", "/health", "/metrics"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        // Construction must not panic on a bad entry
        let _ = cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()]);
        let _ = cors_layer(&[]);
    }
}
