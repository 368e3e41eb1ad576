// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rig daemon (rigd)
//!
//! Serves the execution API and runs the queue worker and monitoring
//! loops on one tokio runtime. State is restored from the snapshot on
//! startup and written back on graceful shutdown.

use rig_server::config::{load_catalog, ServerConfig};
use rig_server::{bootstrap, routes};
use rig_storage::snapshot;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("rigd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("rigd {}", env!("CARGO_PKG_VERSION"));
                println!("Rig daemon - test execution engine server");
                println!();
                println!("USAGE:");
                println!("    rigd [--config <path>]");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <path>   TOML configuration file");
                println!("    -h, --help            Print help information");
                println!("    -V, --version         Print version information");
                return Ok(());
            }
            "--config" | "-c" => {
                config_path = args.next().map(PathBuf::from);
                if config_path.is_none() {
                    eprintln!("error: --config requires a path");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: rigd [--config <path>]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load(config_path.as_deref())?;
    info!(listen_addr = %config.listen_addr, "starting rigd");

    let snapshot_path = config.snapshot_path();
    let store = Arc::new(snapshot::load(&snapshot_path)?);
    info!(traces = store.trace_count(), "store restored");

    let catalog = Arc::new(load_catalog(config.catalog_path.as_deref())?);
    let services = bootstrap(store, config.engine.clone(), catalog);

    // Background loops: queue worker and monitoring.
    let shutdown = Arc::new(Notify::new());
    let worker = services.worker.clone();
    let worker_shutdown = Arc::clone(&shutdown);
    let worker_task = tokio::spawn(async move { worker.run(worker_shutdown).await });
    let monitor = Arc::clone(&services.monitor);
    let monitor_shutdown = Arc::clone(&shutdown);
    let monitor_task = tokio::spawn(async move { monitor.run(monitor_shutdown).await });

    let app = routes::router(Arc::clone(&services.state));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    shutdown.notify_waiters();
    let _ = worker_task.await;
    let _ = monitor_task.await;

    if let Err(e) = snapshot::save(&services.state.store, &snapshot_path) {
        error!(error = %e, "failed to save snapshot on shutdown");
    } else {
        info!(path = %snapshot_path.display(), "snapshot saved");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
