//! PyLearn · Python Exercise Backend
//!
//! - Axum HTTP + WebSocket API
//! - Submissions run as Python subprocesses with a 5 second wall-clock limit
//! - Topic unlock cascade driven by graded submissions
//! - Static SPA fallback (./static/index.html)
//!
//! The sandbox is NOT a security boundary (timeout only). Run this service on an
//! isolated host or container.
//!
//! Important env variables:
//!   PORT                 : u16 (default 8000)
//!   PYLEARN_CONFIG_PATH  : path to TOML config (sandbox settings + curriculum)
//!   PYTHON_BIN           : interpreter override (default "python3")
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod curriculum;
mod normalize;
mod keywords;
mod sandbox;
mod grader;
mod progress;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Curriculum, progress book and grader shared by all handlers.
  let state = Arc::new(AppState::from_env());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "pylearn_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "pylearn_backend", "Server shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "pylearn_backend", error = %e, "Failed to listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
  info!(target: "pylearn_backend", "Shutdown signal received");
}
