// src/main.rs

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use dotenvy::dotenv;
use edurenfort::{
    config::Config,
    routes, seed,
    state::AppState,
    store::{PgStore, Store},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize Database Pool with Retry
    let store = PgStore::connect(&config.database_url, DB_CONNECT_RETRIES).await?;
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    store.run_migrations().await?;
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn Store> = Arc::new(store);

    // Seed Admin User
    if let Err(e) = seed::ensure_admin(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let state = AppState::new(store, config.clone());
    state.files.ensure_dir().await?;
    tracing::info!("Serving uploads from {:?}", state.files.dir());

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
