use shardcache::cache::{new_cache, CacheOptions};
use shardcache::config::ProcessConfig;
use shardcache::http::Server;
use shardcache::metrics::prometheus::PrometheusMeter;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SHARD_COUNT: usize = 512;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .init();

    info!(version = shardcache::VERSION, "starting shardcache");

    let config = match ProcessConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration, shutting down");
            std::process::exit(1);
        }
    };
    info!(
        port = config.port,
        ttl = ?config.cache_ttl,
        max_cache_size = config.max_cache_size,
        max_keys = config.max_keys,
        "configuration loaded"
    );

    let meter = Arc::new(PrometheusMeter::new());
    let cache = match new_cache(
        CacheOptions::new(meter.as_ref())
            .ttl(config.cache_ttl)
            .max_size(config.max_cache_size)
            .max_keys(config.max_keys)
            .shard_count(SHARD_COUNT),
    ) {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            error!(error = %err, "failed to construct cache");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, port = config.port, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(port = config.port, "listening");

    let server = Arc::new(Server::new(cache, meter));
    let server_task = tokio::spawn(server.serve(listener));

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(err)) => error!(error = %err, "server task ended with an error"),
                Err(err) => error!(error = %err, "server task panicked"),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal, draining in-flight connections");
        }
    }

    info!("shardcache shutting down");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
