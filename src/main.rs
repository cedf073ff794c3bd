use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use blobrelay::{AppState, Config, create_app, storage::init_storage};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    let storage = init_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let addr = config.bind_addr();
    let app = create_app(AppState::new(Arc::new(storage), config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
