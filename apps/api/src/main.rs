//! qatrail API composition root.

#![forbid(unsafe_code)]

mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use qatrail_application::{
    ActivityLogRepository, ActivityRecorder, ChangeFeed, EnrichmentResolver, ImportService,
    ProfileRepository, ProjectRepository, QaItemRepository, QaItemService, ReviewRepository,
    ReviewService, TimelineService, TransitionService,
};
use qatrail_core::AppError;
use qatrail_infrastructure::{
    InMemoryQaStore, PostgresActivityLogRepository, PostgresProfileRepository,
    PostgresProjectRepository, PostgresQaItemRepository, PostgresReviewRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

/// Entries buffered per feed subscriber before pushes are dropped.
const FEED_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let storage = env::var("STORAGE").unwrap_or_else(|_| "postgres".to_owned());

    let app_state = match storage.as_str() {
        "memory" => {
            let store = Arc::new(InMemoryQaStore::new());
            let state = build_state(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            );
            dev_seed::seed_demo_data(&state, &store).await?;
            info!("using in-memory storage with demo data");
            state
        }
        "postgres" => {
            let database_url = required_env("DATABASE_URL")?;
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .map_err(|error| {
                    AppError::Transient(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

            if migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            build_state(
                Arc::new(PostgresQaItemRepository::new(pool.clone())),
                Arc::new(PostgresReviewRepository::new(pool.clone())),
                Arc::new(PostgresActivityLogRepository::new(pool.clone())),
                Arc::new(PostgresProjectRepository::new(pool.clone())),
                Arc::new(PostgresProfileRepository::new(pool)),
            )
        }
        other => {
            return Err(AppError::Validation(format!(
                "STORAGE must be either 'postgres' or 'memory', got '{other}'"
            )));
        }
    };

    let protected_routes = Router::new()
        .route("/api/projects", get(handlers::projects::list_projects_handler))
        .route(
            "/api/projects/{project_id}",
            get(handlers::projects::get_project_handler),
        )
        .route(
            "/api/projects/{project_id}/phases",
            get(handlers::projects::list_phases_handler),
        )
        .route(
            "/api/projects/{project_id}/items",
            get(handlers::items::list_project_items_handler),
        )
        .route(
            "/api/projects/{project_id}/import",
            post(handlers::projects::import_items_handler),
        )
        .route(
            "/api/items/{item_id}",
            get(handlers::items::get_item_handler).patch(handlers::items::edit_item_handler),
        )
        .route(
            "/api/items/{item_id}/transition",
            post(handlers::items::transition_item_handler),
        )
        .route(
            "/api/items/{item_id}/reviews",
            get(handlers::reviews::list_reviews_handler)
                .post(handlers::reviews::submit_review_handler),
        )
        .route(
            "/api/items/{item_id}/activity",
            get(handlers::items::item_activity_handler),
        )
        .route(
            "/api/items/{item_id}/attachments/uploaded",
            post(handlers::items::attachment_uploaded_handler),
        )
        .route(
            "/api/items/{item_id}/attachments/deleted",
            post(handlers::items::attachment_deleted_handler),
        )
        .route("/api/timeline", get(handlers::timeline::timeline_handler))
        .route("/api/feed", get(handlers::feed::feed_handler))
        .route("/api/profiles", get(handlers::profiles::list_profiles_handler))
        .route(
            "/api/profiles/{profile_id}",
            get(handlers::profiles::get_profile_handler),
        )
        .route_layer(from_fn(middleware::require_identity));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "qatrail-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn build_state(
    items: Arc<dyn QaItemRepository>,
    reviews: Arc<dyn ReviewRepository>,
    log: Arc<dyn ActivityLogRepository>,
    projects: Arc<dyn ProjectRepository>,
    profiles: Arc<dyn ProfileRepository>,
) -> AppState {
    let feed = ChangeFeed::new(log.clone(), FEED_CAPACITY);
    let transition_service = TransitionService::new(items.clone(), feed.clone());
    let review_service = ReviewService::new(
        items.clone(),
        reviews,
        transition_service.clone(),
        feed.clone(),
    );
    let recorder = ActivityRecorder::new(log.clone(), items.clone(), feed.clone());
    let import_service = ImportService::new(
        items.clone(),
        projects.clone(),
        transition_service.clone(),
        recorder.clone(),
    );
    let resolver = EnrichmentResolver::new(profiles.clone(), items.clone(), projects.clone());
    let timeline_service = TimelineService::new(log, items.clone(), resolver);
    let item_service = QaItemService::new(items, feed.clone());

    AppState {
        item_service,
        transition_service,
        review_service,
        recorder,
        import_service,
        timeline_service,
        feed,
        projects,
        profiles,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
