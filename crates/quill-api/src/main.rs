//! Quill API Server

use quill_api::{build_state, init_tracing, serve};
use quill_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(std::env::var_os("QUILL_CONFIG").map(Into::into))?;
    init_tracing(&config.logging);

    let state = build_state(config).await?;
    serve(state).await
}
