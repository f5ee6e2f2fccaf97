use anyhow::Context;
use sleepsync_server::{app_router, build_state, spawn_propagation_worker, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let state = build_state(config)?;
    let worker = spawn_propagation_worker(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("{} service listening on {}", state.role(), bind_addr);

    axum::serve(listener, app_router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", err);
            }
        })
        .await?;

    if let Some(worker) = worker {
        worker.abort();
    }
    tracing::info!(
        "Shut down; {} operation(s) were served by the fallback store",
        state.fallback_count()
    );
    Ok(())
}
