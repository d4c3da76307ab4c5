//! VLE sync service.
//!
//! Usage:
//!   vlesync --config vlesync.json serve --port 8080
//!   vlesync --config vlesync.json dispatch --input events.ndjson
//!
//! `serve` exposes the reconciliation snapshot over HTTP. `dispatch` reads
//! newline-delimited domain events (from a file or stdin), classifies each
//! one and forwards the resulting operations to the VLE.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vlesync_server::{build_router, AppState, ServiceConfig};
use vlesync_store::DirectoryStore;
use vlesync_sync::{EventClassifier, HttpGateway, Reconciler, SyncDispatcher};
use vlesync_types::DomainEvent;

const QUEUE_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "vlesync")]
#[command(about = "Keeps a VLE in step with the course directory")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the reconciliation endpoint
    Serve {
        /// HTTP port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Classify and forward newline-delimited events
    Dispatch {
        /// Event file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = ServiceConfig::load(args.config.as_deref())?;
    let store = DirectoryStore::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;
    let store = Arc::new(store);

    match args.command {
        Command::Serve { port } => serve(config, store, port).await,
        Command::Dispatch { input } => match input {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                dispatch(config, store, BufReader::new(file)).await
            }
            None => dispatch(config, store, BufReader::new(tokio::io::stdin())).await,
        },
    }
}

async fn serve(config: ServiceConfig, store: Arc<DirectoryStore>, port: u16) -> Result<()> {
    if config.inbound_auth.is_none() {
        warn!("No inbound credentials configured; every request will be rejected");
    }
    let state = AppState {
        reconciler: Arc::new(Reconciler::new(store, config.directory())),
        credentials: config.inbound_auth.clone(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", port))?;
    info!("Reconciliation endpoint listening on port {}", port);
    axum::serve(listener, app).await.context("HTTP server failed")
}

async fn dispatch<R>(config: ServiceConfig, store: Arc<DirectoryStore>, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    if !config.gateway.is_complete() {
        warn!("Gateway not fully configured; operations will be logged but not sent");
    }
    let send_timeout = config.gateway.timeout();
    let gateway = HttpGateway::new(config.gateway.clone())?;
    let classifier = EventClassifier::new(store, config.directory());
    let (handle, task) =
        SyncDispatcher::new(classifier, Arc::new(gateway), send_timeout).spawn(QUEUE_CAPACITY);

    let mut lines = reader.lines();
    let mut line_no: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match DomainEvent::from_json(line) {
            Ok(event) => handle.submit(event).await?,
            Err(e) => warn!(line = line_no, error = %e, "Skipping unreadable event"),
        }
    }
    drop(handle);

    let stats = task.await.context("Dispatcher task panicked")?;
    info!(
        total = stats.total(),
        delivered = stats.delivered,
        skipped = stats.skipped,
        ignored = stats.ignored,
        dropped = stats.dropped,
        failed = stats.failed,
        "Dispatch finished"
    );
    Ok(())
}
