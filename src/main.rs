use sqlx::mysql::MySqlPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weather_tracker_service::api::{create_router, AppState};
use weather_tracker_service::config::Config;
use weather_tracker_service::db::{schema, ObservationRepository};
use weather_tracker_service::fetcher::WeatherFetcher;
use weather_tracker_service::services::WeatherService;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,weather_tracker_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    info!("Starting weather tracker service");

    // Ensure database schema. Failure is non-fatal: the service keeps serving
    // provider-backed routes and database errors surface per request.
    info!("Ensuring database schema...");
    match schema::ensure_schema(&config).await {
        Ok(()) => info!("Database schema ready"),
        Err(e) => error!("Failed to ensure database schema: {}", e),
    }

    // Lazy pool: connections are established on first use, so an unreachable
    // database does not abort startup either.
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(schema::database_options(&config));

    // Create repository, fetcher and service
    let observation_repo = ObservationRepository::new(pool.clone());
    let fetcher = WeatherFetcher::new(config.provider_base_url.clone(), config.api_key.clone());
    let weather_service = WeatherService::new(fetcher, observation_repo);

    // Create API router
    let app_state = AppState { weather_service };
    let app = create_router(app_state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
