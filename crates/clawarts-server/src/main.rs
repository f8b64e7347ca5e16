use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clawarts_server::config::AppConfig;
use clawarts_server::db::Archive;
use clawarts_server::store::Store;
use clawarts_server::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with pretty format
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clawarts=info,clawarts_server=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("            CLAWARTS - Starting Up              ");
    println!("================================================");

    // Load configuration
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    println!("[CONFIG] Server: {}:{}", config.server.host, config.server.port);
    println!(
        "[CONFIG] Settlement: fee={}bps challenger_bonus={}bps guard={} missing_participant={:?}",
        config.settlement.treasury_fee_bps,
        config.settlement.challenger_bonus_bps,
        config.settlement.guard_double_settlement,
        config.settlement.missing_participant
    );
    match config.board.sync_key.as_deref() {
        Some(key) if !key.is_empty() => {
            println!("[CONFIG] Tick sync key: set (length: {})", key.len());
        }
        _ => println!("[CONFIG] Tick sync key: *** EMPTY - SYNC DISABLED, SET TICK_SYNC_KEY ***"),
    }

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Clawarts"
    );

    // Open store
    match &config.store.snapshot_path {
        Some(path) => println!("[STORE] Snapshot file: {}", path.display()),
        None => println!("[STORE] In-memory only, state is lost on restart"),
    }
    let store = Store::open(config.store.snapshot_path.clone()).await?;

    // Archive
    let archive = Archive::new(&config.archive);
    if archive.is_enabled() {
        match archive.health_check().await {
            Ok(_) => {
                println!("[ARCHIVE] ClickHouse connected successfully");
                tracing::info!("Connected to ClickHouse");
                if let Err(e) = archive.ensure_schema().await {
                    tracing::warn!(error = %e, "Failed to create archive tables");
                }
            }
            Err(e) => {
                println!("[ARCHIVE] WARNING: ClickHouse not available - {}", e);
                tracing::warn!(error = %e, "ClickHouse not available, archive writes will fail");
            }
        }
    }

    let addr: SocketAddr = config.server_addr().parse()?;
    let state = AppState::new(config, store, archive)?;

    println!("[ROUTER] Setting up API routes...");
    let app = create_app(state);
    println!("[ROUTER] Routes configured: /health, /api/clawarts/*, /api/tick/*");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("================================================");
    println!("  Server listening on http://{}", addr);
    println!("================================================");
    println!();

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    println!("[SHUTDOWN] Signal received, draining connections");
}
