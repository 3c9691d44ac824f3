use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

mod api;
mod config;
mod convert;
mod db;
mod error;
mod fingerprint;
mod pipeline;
mod poller;
mod service;
mod storage;

use crate::config::AppConfig;
use crate::convert::HttpConverter;
use crate::db::Database;
use crate::pipeline::Pipeline;
use crate::poller::Poller;
use crate::service::RelayService;
use crate::storage::{FsObjectStore, ObjectStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Starting docrelay service v{}", env!("CARGO_PKG_VERSION"));

    let app_config = AppConfig::load()?;
    info!(
        host = %app_config.server.host,
        port = app_config.server.port,
        bucket_root = %app_config.storage.bucket_root.display(),
        converter = %app_config.converter.base_url,
        "Configuration loaded"
    );

    std::fs::create_dir_all(&app_config.storage.data_dir)?;
    std::fs::create_dir_all(&app_config.storage.bucket_root)?;

    let db_path = app_config.storage.data_dir.join("docrelay.db");
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let store: Arc<dyn ObjectStore> =
        Arc::new(FsObjectStore::new(app_config.storage.bucket_root.clone()));
    let converter = Arc::new(HttpConverter::new(app_config.converter.clone())?);

    let pipeline = Arc::new(Pipeline::new(
        db.clone(),
        store.clone(),
        converter,
        app_config.processing.clone(),
        app_config.storage.destination_prefix.clone(),
    ));
    let poller = Arc::new(Poller::new(
        db.clone(),
        store.clone(),
        pipeline,
        app_config.processing.clone(),
        app_config.storage.source_prefix.clone(),
    ));

    // Capacity 1 is enough: a pending nudge already means "run a cycle soon"
    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    tokio::spawn(poller.clone().run(trigger_rx));

    let service = Arc::new(RelayService::new(
        db,
        store,
        poller,
        trigger_tx,
        app_config.storage.source_prefix.clone(),
    ));

    let app = api::router(service);

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docrelay_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
