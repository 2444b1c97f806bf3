use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use splus_cache::cache;
use splus_cache::cli::Cli;
use splus_cache::config::Config;
use splus_cache::http::{self, AppState};
use splus_cache::logging;
use splus_cache::signals;
use splus_cache::store::{self, WriteQueue, Writer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = Config::from_env(&cli);

    tracing::info!(
        port = config.port,
        concurrency = config.concurrency,
        database = %config.database.display(),
        "starting splus-cache"
    );

    let queue = Arc::new(WriteQueue::new());
    let mut writer = Writer::spawn(config.database.clone(), queue.clone())
        .context("failed to start writer thread")?;

    let pool = store::pool::build(&config.database, config.concurrency as u32)
        .context("failed to build read connection pool")?;

    let state = AppState {
        cache: cache::CacheMap::new(),
        pool,
        queue,
    };

    let app = http::router(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %bind_addr, "listening");

    let shutdown_rx = signals::spawn_handler();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await
        .context("server error")?;

    tracing::info!("draining write queue before exit");
    writer.shutdown();
    tracing::info!("shutdown complete");

    Ok(())
}
