//! HTTP health endpoint and on-demand command routes.
//!
//! Routes:
//! - `/api/health` → `200` with an empty body, for any method
//! - `GET /api/commands/:name` → command reply as plain text, `404` for an
//!   unknown command, `502` when the game server cannot be reached

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{any, get},
    Router,
};
use ficsit_core::MessageTemplate;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::commands::BotCommand;
use crate::fetcher::StateFetcher;

/// Errors from the health server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind health endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Health server failed: {0}")]
    Serve(#[from] io::Error),
}

/// Shared state for the route handlers.
#[derive(Clone)]
pub struct HealthState {
    pub fetcher: Arc<dyn StateFetcher>,
    pub template: MessageTemplate,
}

pub fn create_router(state: HealthState) -> Router {
    Router::new()
        .route("/api/health", any(health))
        .route("/api/commands/:name", get(run_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn run_command(
    State(state): State<HealthState>,
    Path(name): Path<String>,
) -> Result<String, (StatusCode, String)> {
    let Some(command) = BotCommand::parse(&name) else {
        return Err((StatusCode::NOT_FOUND, format!("Unknown command: {name}")));
    };

    command
        .respond(state.fetcher.as_ref(), &state.template)
        .await
        .map_err(|e| {
            warn!(command = %command, error = %e, "Command failed");
            (StatusCode::BAD_GATEWAY, e.to_string())
        })
}

/// A bound, not yet serving, health listener.
pub struct HealthServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl HealthServer {
    /// Binds the listener. Failing here is fatal at startup.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        Ok(Self { listener, addr })
    }

    /// Actual bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until `cancel_token` fires.
    pub async fn run(
        self,
        state: HealthState,
        cancel_token: CancellationToken,
    ) -> Result<(), ServerError> {
        info!(addr = %self.addr, "Health endpoint listening");

        axum::serve(self.listener, create_router(state))
            .with_graceful_shutdown(async move { cancel_token.cancelled().await })
            .await?;

        info!("Health endpoint stopped");
        Ok(())
    }
}
