//! tvctl - Appliance session server launcher
//!
//! Starts one command listener and one broadcast listener per configured appliance.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tvctl_server::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if TVCTL_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("TVCTL_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting tvctl on {}", config.host);

    let mut servers = Vec::new();
    for server_config in config.server_configs() {
        let server = Arc::new(Server::bind(server_config).await);
        match (server.local_addr(), server.broadcast_addr()) {
            (Some(command), Some(broadcast)) => tracing::info!(
                "  {:<20} command {}  broadcast {}",
                server.name(),
                command,
                broadcast
            ),
            _ => tracing::warn!("  {:<20} not started (bind failed)", server.name()),
        }
        servers.push(server);
    }

    if servers.iter().all(|s| s.local_addr().is_none()) {
        return Err("no appliance could be bound".into());
    }

    // Spawn shutdown signal handler
    let shutdown_servers = servers.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping servers...");
        for server in &shutdown_servers {
            server.shutdown();
        }
    });

    // Run every bound server (blocks until shutdown)
    let handles: Vec<_> = servers
        .iter()
        .filter(|s| s.local_addr().is_some())
        .map(|server| {
            let server = server.clone();
            tokio::spawn(async move { server.run().await })
        })
        .collect();

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Server error: {}", e),
            Err(e) => tracing::error!("Server task failed: {}", e),
        }
    }

    tracing::info!("All servers stopped");
    Ok(())
}
