// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relational_auth::{
    api::router,
    auth::{InMemoryRevocationRegistry, RevocationRegistry},
    config::{LogFormat, Settings, DEFAULT_LOG_FILTER},
    pruner::RevocationPruner,
    state::AppState,
    storage::{CredentialDatabase, CredentialStore, InMemoryStore},
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal, stopping gracefully...");
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env().expect("Invalid configuration");
    init_tracing(settings.log_format);

    // Credential store and revocation registry share a backend
    let (store, revocations): (Arc<dyn CredentialStore>, Arc<dyn RevocationRegistry>) =
        match settings.database_path() {
            Some(path) => {
                let db = Arc::new(CredentialDatabase::open(&path).expect("Failed to open database"));
                info!(path = %path.display(), "Using persistent credential database");
                let store: Arc<dyn CredentialStore> = db.clone();
                let revocations: Arc<dyn RevocationRegistry> = db;
                (store, revocations)
            }
            None => {
                info!("DATA_DIR not set, using in-memory store (state is lost on restart)");
                let store: Arc<dyn CredentialStore> = Arc::new(InMemoryStore::new());
                let revocations: Arc<dyn RevocationRegistry> = Arc::new(InMemoryRevocationRegistry::new());
                (store, revocations)
            }
        };

    let state = AppState::new(&settings, store, revocations.clone()).expect("Invalid token configuration");

    // Bootstrap data
    let mut seed_creator = uuid::Uuid::nil();
    if let Some(admin) = &settings.seed_admin {
        seed_creator = state
            .registration
            .seed_admin(&admin.username, &admin.password)
            .await
            .expect("Failed to seed admin account");
    }
    if let Some(code) = &settings.seed_invite_code {
        state
            .registration
            .seed_invite_code(code, seed_creator)
            .await
            .expect("Failed to seed invite code");
    }

    let shutdown = CancellationToken::new();
    let pruner = RevocationPruner::new(revocations, settings.prune_interval);
    let pruner_handle = tokio::spawn(pruner.run(shutdown.clone()));

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(%addr, "Relational Auth server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    if let Err(e) = pruner_handle.await {
        error!(error = %e, "Revocation pruner task failed");
    }
    info!("Server stopped");
}
