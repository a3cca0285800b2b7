//! Wishlist API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! starts the blacklist sweeper and serves the REST API until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use wishlist_api::config::ApiConfig;
use wishlist_core::auth::blacklist::{DEFAULT_SWEEP_TASK_PERIOD, TokenBlacklist};
use wishlist_core::store::PgStore;

/// CLI arguments. Each flag overrides the matching environment setting.
#[derive(Parser, Debug)]
#[command(name = "wishlist_server", about = "Wishlist gift registry API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS")]
    max_connections: Option<u32>,

    /// Seconds between background blacklist sweeps.
    #[arg(long, default_value_t = DEFAULT_SWEEP_TASK_PERIOD.as_secs())]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,wishlist_api=debug,wishlist_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env().inspect_err(|e| error!(%e, "invalid configuration"))?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(max) = args.max_connections {
        config.database_max_connections = max;
    }
    config
        .validate()
        .inspect_err(|e| error!(%e, "invalid configuration"))?;

    info!(
        bind_addr = %config.bind_addr,
        max_connections = config.database_max_connections,
        token_minutes = config.jwt.expiration_minutes,
        "starting wishlist_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    wishlist_api::migrate(&pool).await?;

    let blacklist = Arc::new(TokenBlacklist::new());
    let sweeper =
        blacklist.spawn_sweep_task(std::time::Duration::from_secs(args.sweep_interval_secs.max(1)));

    let state = wishlist_api::AppState::with_blacklist(
        Arc::new(PgStore::new(pool)),
        config.clone(),
        blacklist,
    )?;
    let app = wishlist_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    sweeper.abort();
    Ok(())
}
