use std::net::SocketAddr;

use vocab_backend_rust::auth::AuthConfig;
use vocab_backend_rust::config::Config;
use vocab_backend_rust::db::operations::user::delete_expired_sessions;
use vocab_backend_rust::db::Database;
use vocab_backend_rust::logging::{init_tracing, LogSettings};
use vocab_backend_rust::seed::seed_from_json;
use vocab_backend_rust::services::llm_provider::LlmProvider;
use vocab_backend_rust::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));

    let auth = match AuthConfig::from_env() {
        Ok(auth) => auth,
        Err(err) => {
            tracing::error!(error = %err, "invalid auth configuration");
            std::process::exit(1);
        }
    };

    let db = match Database::from_env().await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "database initialization failed");
            std::process::exit(1);
        }
    };

    if let Some(path) = config.seed_file.as_deref() {
        if let Err(err) = seed_from_json(&db, path).await {
            tracing::warn!(error = %err, path = %path.display(), "seed import skipped");
        }
    }

    match delete_expired_sessions(db.pool()).await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "expired sessions purged"),
        Err(err) => tracing::warn!(error = %err, "expired session purge failed"),
    }

    let llm = LlmProvider::from_env();
    if !llm.is_available() {
        tracing::warn!("LLM_API_KEY not set, lookups will report failures");
    }

    let addr = config.bind_addr();
    let state = AppState::new(db.clone(), llm, auth, config);
    let app = vocab_backend_rust::create_app(state);

    tracing::info!(%addr, "vocab backend listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database");
    db.close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
