//! chatrelay-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build the relay (Ollama HTTP client and Gemini CLI launcher).
//! 4. Build the Axum router and start the HTTP server with graceful shutdown,
//!    optionally opening the landing page in the local browser.

mod config;
mod error;
mod middleware;
mod net;
mod routes;
mod schemas;
mod state;

use std::sync::Arc;
use std::time::Duration;

use chatrelay_core::Relay;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

/// Gives the listener a moment before the browser requests the page.
const BROWSER_DELAY: Duration = Duration::from_millis(800);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CHATRELAY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay-server starting");

    // ── 3. Relay ───────────────────────────────────────────────────────────────
    let relay = Relay::from_config(cfg.ollama(), cfg.gemini())?;
    info!(
        ollama = %cfg.ollama_base,
        model = %cfg.ollama_model,
        gemini_cmd = %cfg.gemini_cmd,
        gemini_model = %cfg.gemini_model,
        "relay ready"
    );

    let chat_url = net::chat_url(net::local_ip(), cfg.port);
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        relay: Arc::new(relay),
        chat_url: chat_url.clone(),
    });

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    info!(url = %chat_url, "chat endpoint reachable on the LAN");
    if cfg.open_browser {
        net::open_browser_later(net::landing_url(cfg.port, &chat_url), BROWSER_DELAY);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("chatrelay-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
