//! mtb-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, resolves config,
//! opens the terminal, wires middleware and serves HTTP until a shutdown
//! signal. All route handlers live in `routes.rs`.
//!
//! The terminal connection spans the process lifetime: it is opened before
//! the listener binds (failure is fatal) and released after the server has
//! drained.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mtb_config::{BridgeConfig, TerminalBackend, ENV_API_KEY};
use mtb_daemon::{routes, state};
use mtb_terminal::TerminalHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = BridgeConfig::from_env().context("config load failed")?;
    if cfg.api_key.is_insecure_default() {
        warn!(
            "{} is unset or the default placeholder; protected routes are effectively open. \
             Set a real key before exposing this bridge.",
            ENV_API_KEY
        );
    }

    match &cfg.terminal {
        TerminalBackend::Paper { symbols } => {
            info!(symbols = symbols.len(), "terminal backend: paper")
        }
        TerminalBackend::Gateway { base_url, .. } => {
            info!(%base_url, "terminal backend: gateway")
        }
    }

    let terminal = TerminalHandle::start(state::backend_factory(&cfg.terminal))
        .await
        .context("terminal initialize failed")?;

    let shared = Arc::new(state::AppState::new(terminal.clone(), cfg.api_key.clone()));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let listener = match tokio::net::TcpListener::bind(cfg.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            terminal.shutdown().await;
            return Err(e).with_context(|| format!("bind {}", cfg.bind_addr));
        }
    };
    info!("mtb-daemon listening on http://{}", cfg.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    terminal.shutdown().await;
    served.context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
