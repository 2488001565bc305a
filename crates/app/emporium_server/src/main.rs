//! Emporium authentication API server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use emporium_api::config::ApiConfig;
use emporium_core::auth::oauth::{OAuthStateStore, create_provider};
use emporium_core::auth::session::{MemorySessionStore, PgSessionStore, SessionStore};
use emporium_core::auth::users::PgUserRepository;
use emporium_core::auth::{AuthManager, TokenCodec};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Where live sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SessionBackend {
    /// Process memory; sessions are lost on restart.
    Memory,
    /// The `sessions` table.
    Postgres,
}

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "emporium_server", about = "Emporium authentication API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Session store backend.
    #[arg(long, value_enum, env = "SESSION_STORE", default_value = "postgres")]
    session_store: SessionBackend,

    /// Seconds between sweeps of expired sessions.
    #[arg(long, default_value_t = 300)]
    purge_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,emporium_api=debug,emporium_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }

    info!(
        bind_addr = %config.bind_addr,
        session_store = ?args.session_store,
        max_connections = args.max_connections,
        "starting emporium_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    info!("running database migrations");
    emporium_api::migrate(&pool).await?;

    let purge_every = Duration::from_secs(args.purge_interval_secs.max(1));
    let sessions: Arc<dyn SessionStore> = match args.session_store {
        SessionBackend::Memory => {
            let store = Arc::new(MemorySessionStore::new());
            store.spawn_cleanup_task(purge_every);
            store
        }
        SessionBackend::Postgres => {
            let store = Arc::new(PgSessionStore::new(pool.clone()));
            let sweeper = Arc::clone(&store);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(purge_every);
                loop {
                    interval.tick().await;
                    match sweeper.purge_expired().await {
                        Ok(0) => {}
                        Ok(n) => info!(purged = n, "expired sessions removed"),
                        Err(e) => warn!(error = %e, "session purge failed"),
                    }
                }
            });
            store
        }
    };

    let mut auth = AuthManager::new(
        TokenCodec::new(config.jwt_secret.as_bytes()),
        Arc::new(PgUserRepository::new(pool)),
        sessions,
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    for (name, credentials) in config.oauth_credentials() {
        if let Some(provider) = create_provider(name, http.clone(), credentials)? {
            auth.register_oauth_provider(name, provider);
            info!(provider = name, "oauth provider enabled");
        }
    }

    let oauth_state = Arc::new(OAuthStateStore::new());
    oauth_state.spawn_cleanup_task();

    let state = emporium_api::AppState {
        auth: Arc::new(auth),
        oauth_state,
        config: config.clone(),
    };

    let app = emporium_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
