// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Eravat Sync Agent
//!
//! Local companion for the field app: queues elephant activity reports while
//! offline and syncs them to Supabase when the network returns.

use eravat_sync::{
    config::Config,
    routes::create_router,
    services::{spawn_sync_loop, NetworkMonitor, RetryPolicy, SupabaseClient, SyncEngine},
    store::ReportStore,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Eravat sync agent");

    // Open the local queue
    let store = ReportStore::from_config(&config)
        .await
        .expect("Failed to open queue store");

    let submitter = SupabaseClient::new(&config).expect("Failed to build Supabase client");
    tracing::info!(url = %config.supabase_url, table = %config.reports_table, "Supabase client initialized");

    // Assume online until the platform bridge or the probe says otherwise
    let network = NetworkMonitor::new(true, config.ping_url.clone());

    let sync = Arc::new(
        SyncEngine::open(
            store,
            submitter,
            network.clone(),
            RetryPolicy::from_config(&config),
        )
        .await
        .expect("Failed to open sync engine"),
    );

    let _sync_loop = spawn_sync_loop(sync.clone(), config.sync_interval);
    tracing::info!(
        interval_secs = config.sync_interval.as_secs(),
        "Sync loop started"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        network,
        sync,
    });

    // Build router
    let app = create_router(state);

    // Start server (loopback only; the app shell is the sole client)
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eravat_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
