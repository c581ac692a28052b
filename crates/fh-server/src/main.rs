//! Firehose server — filtered-stream ingestion behind a small HTTP API.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fh_connector::StreamConnector;
use fh_core::{FirehoseConfig, Shutdown, CONFIG_ENV};
use fh_ingest::{IngestionCoordinator, TweetQueries};
use fh_rules::{HttpRulesTransport, RuleRegistry};
use fh_store::{EventStore, MemoryEventStore};
use tokio::sync::Mutex;

use crate::server::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "firehose", about = "Filtered-stream ingestion server")]
struct Cli {
    /// Config file (defaults to $FIREHOSE_CONFIG, then ./firehose.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve the API without opening the stream at startup
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => {
            let cfg = FirehoseConfig::load_from_path(path)
                .with_context(|| format!("loading {}", path.display()))?;
            cfg.validate()?;
            cfg
        }
        None => FirehoseConfig::load().with_context(|| format!("loading config (see {CONFIG_ENV})"))?,
    };
    log::info!("Firehose boot: stream {} listening on {}", cfg.base_uri, cfg.listen_addr);

    let shutdown = Shutdown::new();
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let registry = RuleRegistry::new(Arc::new(HttpRulesTransport::new(&cfg)?));
    let connector = StreamConnector::http(&cfg, Arc::clone(&store))?.with_shutdown(shutdown.clone());

    let state = AppState {
        coordinator: Arc::new(IngestionCoordinator::new(
            registry,
            Arc::clone(&store),
            &cfg,
            shutdown.clone(),
        )),
        queries: TweetQueries::new(Arc::clone(&store), &cfg),
        connector: Arc::new(connector),
        supervisor: Arc::new(Mutex::new(None)),
        shutdown: shutdown.clone(),
        cfg: Arc::new(cfg),
    };

    if !cli.no_stream {
        state.start_stream().await;
    }

    let listener = tokio::net::TcpListener::bind(state.cfg.listen_addr.as_str())
        .await
        .with_context(|| format!("binding {}", state.cfg.listen_addr))?;
    log::info!("HTTP server listening on {}", state.cfg.listen_addr);

    let supervisor = Arc::clone(&state.supervisor);
    let signal = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for ctrl-c: {}", e);
            }
            log::info!("Shutdown requested");
            signal.trigger();
        })
        .await?;

    if let Some(supervisor) = supervisor.lock().await.take() {
        let status = supervisor.stop().await;
        log::info!("Stream supervisor stopped after {} session(s)", status.sessions);
    }
    Ok(())
}
