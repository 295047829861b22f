//! Bricklayer Daemon
//!
//! Serves the BioBrick parts catalog over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Serve an already seeded database
//! bricklayer
//!
//! # Download the registry dump and reseed before serving
//! bricklayer --seed-db
//!
//! # Custom port and data directory
//! bricklayer --port 8080 --storage-dir /data/bricklayer
//!
//! # Reuse a local copy of the dump between seeds
//! bricklayer --seed-db --dump-file ./allpart.dump
//! ```

use bricklayer::{
    Catalog, Config, ExtendedResolver, HttpServer, IgemClient, IgemClientConfig, PartsUpstream,
    Seeder, SeederConfig, SledStore, Store, WriteBack, WriteBackConfig,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bricklayer")]
#[command(about = "BioBrick parts catalog service")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Port on which to listen for requests
    #[arg(short, long, env = "BRICKLAYER_PORT")]
    port: Option<u16>,

    /// Seed the database with data from the iGEM registry before serving
    #[arg(long)]
    seed_db: bool,

    /// Exit after seeding instead of serving
    #[arg(long, requires = "seed_db")]
    seed_only: bool,

    /// Local copy of the registry dump, read if present, written otherwise
    #[arg(long)]
    dump_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bricklayer=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "bricklayer stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(dump_file) = args.dump_file {
        config.dump_file = Some(dump_file);
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        "Starting bricklayer"
    );

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    info!(path = %config.db_path().display(), "Opening parts database");
    let sled_store = SledStore::open(config.db_path(), config.cache_capacity_bytes)
        .await
        .map_err(|e| format!("cannot open parts database at {}: {}", config.db_path().display(), e))?;
    let sled_store = Arc::new(sled_store);
    let store: Arc<dyn Store> = sled_store.clone();

    let upstream: Arc<dyn PartsUpstream> = Arc::new(IgemClient::new(IgemClientConfig {
        dump_url: config.dump_url.clone(),
        part_api_url: config.part_api_url.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    }));
    let catalog = Catalog::new(Arc::clone(&store));

    if args.seed_db {
        info!("Seeding database from the iGEM registry");
        let seeder = Seeder::new(catalog.clone(), Arc::clone(&upstream)).with_config(SeederConfig {
            dump_file: config.dump_file.clone(),
        });
        let report = seeder.seed().await?;
        sled_store.flush().await?;
        info!(generation = report.generation, records = report.records, "Seed complete");

        if args.seed_only {
            return Ok(());
        }
    }

    let writeback = WriteBack::new(
        Arc::clone(&store),
        WriteBackConfig {
            workers: config.writeback_workers,
            queue_size: config.writeback_queue,
        },
    );
    let resolver = Arc::new(ExtendedResolver::new(
        catalog.clone(),
        Arc::clone(&upstream),
        writeback.clone(),
    ));

    let http_addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let http_server = Arc::new(HttpServer::new(catalog, resolver, http_addr));

    info!("Endpoints:");
    info!("  GET /health                     - Health check");
    info!("  GET /api/parts/                 - All part names");
    info!("  GET /api/parts/{{name}}          - Basic part record");
    info!("  GET /api/extended-parts/{{name}} - Extended part record");
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            result?;
        }
        _ = shutdown => {}
    }

    // Let queued write-backs land before closing the database
    writeback.wait_idle().await;
    sled_store.flush().await?;

    Ok(())
}
