use std::sync::Arc;

use anyhow::Context;

use lexportal_api::app::{build_app, services::AppServices};
use lexportal_infra::AppConfig;
use lexportal_observability::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    lexportal_observability::init(&LogConfig {
        json: config.log.json,
        ..LogConfig::default()
    });

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize stores")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
