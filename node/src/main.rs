// Copyright (c) 2026 Lumentix Contributors. MIT License.
// See LICENSE for details.

//! # Lumentix Node
//!
//! Entry point for the `lumentix-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the ticketing core to its
//! collaborators, and serves the HTTP API.
//!
//! - `run`     — start the API and metrics servers
//! - `status`  — query a running node's health endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod upstream;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use lumentix_core::{IssuanceVerifier, TicketDb, TicketQueries, TransferAuthorizer};

use cli::{Commands, LumentixCli};
use logging::LogFormat;
use metrics::TicketMetrics;
use upstream::{HorizonClient, HttpPaymentLookup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LumentixCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format);

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        payments_url = %args.payments_url,
        horizon_url = %args.horizon_url,
        "starting lumentix-node"
    );

    // --- Ticket store ---
    let db_path = args.data_dir.join("tickets");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = Arc::new(
        TicketDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), tickets = db.ticket_count(), "ticket store opened");

    // --- Upstream collaborators ---
    let timeout = Duration::from_secs(args.upstream_timeout_secs);
    let payments = Arc::new(
        HttpPaymentLookup::new(&args.payments_url, timeout)
            .with_context(|| format!("invalid payments URL: {}", args.payments_url))?,
    );
    let horizon = Arc::new(
        HorizonClient::new(&args.horizon_url, timeout)
            .with_context(|| format!("invalid Horizon URL: {}", args.horizon_url))?,
    );

    // --- Metrics ---
    let ticket_metrics = Arc::new(TicketMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        issuer: IssuanceVerifier::new(payments, horizon, db.clone()),
        transfers: TransferAuthorizer::new(db.clone()),
        queries: TicketQueries::new(db.clone()),
        metrics: Arc::clone(&ticket_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ticket_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush ticket store")?;
    tracing::info!("lumentix-node stopped");
    Ok(())
}

/// Queries a running node's health endpoint and prints the body.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    logging::init_logging("lumentix_node=warn", LogFormat::Pretty);

    let url = format!("{}/health", args.api_url.trim_end_matches('/'));
    let body = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?
        .error_for_status()
        .with_context(|| format!("{} returned an error status", url))?
        .text()
        .await
        .context("failed to read health response")?;
    println!("{}", body);
    Ok(())
}

fn print_version() {
    println!("lumentix-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc         {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
