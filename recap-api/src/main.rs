//! recap-api - usage-gated video summary service

use anyhow::Result;
use clap::Parser;
use recap_api::{build_router, summarizer::PlaceholderSummarizer, AppState};
use recap_common::config::{prepare_root_folder, resolve_root_folder};
use recap_common::db::init::{get_setting_i64, init_database};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "recap-api", about = "Usage-gated video summary service")]
struct Args {
    /// Root folder holding the database (falls back to RECAP_ROOT, then
    /// the config file, then the OS default)
    #[arg(long)]
    root_folder: Option<String>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5790)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Recap API v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "RECAP_ROOT");
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database ready");

    let cache_ttl_secs = get_setting_i64(&pool, "usage_cache_ttl_seconds", 30).await?;
    let lock_max_wait_ms = get_setting_i64(&pool, "database_busy_timeout_ms", 5000).await?;

    let state = AppState::new(
        pool,
        cache_ttl_secs.max(0) as u64,
        lock_max_wait_ms.max(0) as u64,
        Arc::new(PlaceholderSummarizer),
    );
    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("recap-api listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
