use axum::Router;
use axum::http::{HeaderValue, Method, header};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ravebill::config::Config;
use ravebill::db::{AppState, create_pool, init_db, queries};
use ravebill::flutterwave::FlutterwaveClient;
use ravebill::handlers;
use ravebill::models::SyncUser;

#[derive(Parser, Debug)]
#[command(name = "ravebill")]
#[command(about = "Flutterwave-backed subscription billing service")]
struct Cli {
    /// Seed the database with a dev user (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a dev user for local checkout testing.
/// Only runs in dev mode and when the user does not already exist.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let email = "dev@ravebill.local";
    let existing = queries::get_user_by_email(&conn, email).expect("Failed to check for dev user");
    if existing.is_some() {
        tracing::info!("Dev user already exists, skipping seed");
        return;
    }

    let input = SyncUser {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        full_name: Some("Dev User".to_string()),
    };
    let user = queries::upsert_user(&conn, &input).expect("Failed to create dev user");

    tracing::info!("============================================");
    tracing::info!("DEV USER SEEDED");
    tracing::info!("Email: {}", user.email);
    tracing::info!("User ID: {}", user.id);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ravebill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.flw_secret_key.is_empty() {
        tracing::warn!("FLW_SECRET_KEY is not set; Flutterwave calls will be rejected upstream");
    }
    if config.flw_webhook_hash.is_empty() {
        tracing::warn!("FLW_WEBHOOK_HASH is not set; all webhook deliveries will be rejected");
    }
    if config.is_test_mode() {
        tracing::info!("Flutterwave sandbox keys detected, test mode enabled");
    }

    // Create database connection pool and initialize the schema
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        flutterwave: FlutterwaveClient::new(&config),
        webhook_hash: config.flw_webhook_hash.clone(),
        test_mode: config.is_test_mode(),
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set RAVEBILL_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .expect("FRONTEND_ORIGIN must be a valid origin"),
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    // Build the application router
    let app = Router::new()
        // Public endpoints (per-IP rate limits)
        .merge(handlers::router(config.rate_limit))
        // Webhook endpoint (shared-secret auth, no rate limit)
        .merge(handlers::webhook::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Ravebill server listening on {}", addr);

    // Run server with graceful shutdown
    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
