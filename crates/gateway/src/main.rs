//! PaperDesk API Gateway
//!
//! JSON admin API over the PaperDesk records.
//! Handles:
//! - Identity (JWT) and per-resource permission checks
//! - Tag extraction for papers
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use paperdesk_common::{
    auth::{HasJwt, JwtManager},
    cache::Cache,
    config::AppConfig,
    db::{DbPool, Repository},
    errors::AppError,
    metrics,
    storage::{FileStore, LocalFileStore},
    tagging::{create_completion_client, MemoryTagCache, RedisTagCache, TagCache, TagExtractor},
    ADMIN_ROLE_TITLE,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often stale exports are pruned
const EXPORT_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub tagger: Arc<TagExtractor>,
    pub jwt: Arc<JwtManager>,
    /// Paper attachments (public disk)
    pub files: Arc<dyn FileStore>,
    /// Export artifacts (private disk)
    pub exports: Arc<dyn FileStore>,
    pub cache: Option<Arc<Cache>>,
}

impl HasJwt for AppState {
    fn jwt(&self) -> &JwtManager {
        &self.jwt
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);

    info!("Starting PaperDesk API Gateway v{}", paperdesk_common::VERSION);

    // Initialize metrics
    init_metrics(&config)?;
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    let repo = Repository::new(db);

    if std::env::args().any(|arg| arg == "--seed-permissions") {
        let report = repo.seed_permissions(ADMIN_ROLE_TITLE).await?;
        info!(
            role_id = report.role_id,
            created = report.permissions_created,
            granted = report.grants_added,
            "Seeding finished"
        );
        return Ok(());
    }

    let state = build_state(config.clone(), repo).await?;

    spawn_export_pruner(state.clone());

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber from observability settings.
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{level},paperdesk_gateway={level},paperdesk_common={level},\
             tower_http=info,sqlx::query=warn",
            level = config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.observability.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Install the Prometheus recorder and its scrape listener
fn init_metrics(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.observability.metrics_port;
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("completion_duration_seconds".to_string()),
            metrics::COMPLETION_BUCKETS,
        )?
        .install()?;

    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Wire the shared services
async fn build_state(
    config: Arc<AppConfig>,
    repo: Repository,
) -> paperdesk_common::Result<AppState> {
    let secret = config.auth.secret().ok_or_else(|| AppError::Configuration {
        message: "auth.jwt_secret is not set (APP__AUTH__JWT_SECRET)".to_string(),
    })?;
    let jwt = JwtManager::new(secret, config.auth.jwt_expiration_secs);

    let cache = match &config.redis {
        Some(redis) => {
            info!("Connecting to Redis...");
            Some(Arc::new(Cache::new(redis).await?))
        }
        None => None,
    };

    let tag_cache: Arc<dyn TagCache> = match &cache {
        Some(cache) => Arc::new(RedisTagCache::new(cache.clone())),
        None => {
            warn!("Redis not configured; tag cache is process-local");
            Arc::new(MemoryTagCache::new())
        }
    };

    let client = create_completion_client(&config.openai)?;
    let tagger = TagExtractor::new(client, tag_cache, config.tagging.clone());

    Ok(AppState {
        jwt: Arc::new(jwt),
        files: Arc::new(LocalFileStore::new(&config.storage.public_root)),
        exports: Arc::new(LocalFileStore::new(&config.storage.private_root)),
        tagger: Arc::new(tagger),
        repo,
        cache,
        config,
    })
}

/// Periodically delete exports past their retention
fn spawn_export_pruner(state: AppState) {
    let retention = Duration::from_secs(state.config.storage.export_retention_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EXPORT_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = state.repo.prune_exports(retention, state.exports.as_ref()).await {
                warn!(error = %e, "Export pruning failed");
            }
        }
    });
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Identity
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))

        // Paper endpoints
        .route("/papers", get(handlers::papers::list_papers).post(handlers::papers::create_paper))
        .route(
            "/papers/{id}",
            get(handlers::papers::get_paper)
                .put(handlers::papers::update_paper)
                .delete(handlers::papers::delete_paper),
        )

        // Tag extraction
        .route("/papers/{id}/tags/extract", post(handlers::tags::extract_paper_tags))
        .route("/tags/extract", post(handlers::tags::extract_tags))

        // People
        .route("/people", get(handlers::people::list_people).post(handlers::people::create_person))
        .route(
            "/people/{id}",
            get(handlers::people::get_person)
                .put(handlers::people::update_person)
                .delete(handlers::people::delete_person),
        )

        // Geography
        .route(
            "/countries",
            get(handlers::locations::list_countries).post(handlers::locations::create_country),
        )
        .route(
            "/countries/{id}",
            get(handlers::locations::get_country)
                .put(handlers::locations::update_country)
                .delete(handlers::locations::delete_country),
        )
        .route(
            "/provinces",
            get(handlers::locations::list_provinces).post(handlers::locations::create_province),
        )
        .route(
            "/provinces/{id}",
            get(handlers::locations::get_province)
                .put(handlers::locations::update_province)
                .delete(handlers::locations::delete_province),
        )
        .route(
            "/cities",
            get(handlers::locations::list_cities).post(handlers::locations::create_city),
        )
        .route(
            "/cities/{id}",
            get(handlers::locations::get_city)
                .put(handlers::locations::update_city)
                .delete(handlers::locations::delete_city),
        )

        // Paper types
        .route(
            "/paper-types",
            get(handlers::paper_types::list_paper_types)
                .post(handlers::paper_types::create_paper_type),
        )
        .route(
            "/paper-types/{id}",
            delete(handlers::paper_types::delete_paper_type),
        )

        // Roles and permissions
        .route("/roles", get(handlers::roles::list_roles).post(handlers::roles::create_role))
        .route(
            "/roles/{id}",
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role),
        )
        .route("/permissions", get(handlers::roles::list_permissions))
        .route(
            "/roles/{id}/permissions/{permission_id}",
            post(handlers::roles::grant_permission).delete(handlers::roles::revoke_permission),
        )

        // Users
        .route("/users", get(handlers::users::list_users).post(handlers::users::create_user))
        .route(
            "/users/{id}",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        .route("/users/{id}/roles", put(handlers::users::set_user_roles))

        .route_layer(from_fn(middleware::metrics::track_requests));

    let api_routes = if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        api_routes.layer(from_fn(move |request: Request, next: Next| {
            middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone())
        }))
    } else {
        api_routes
    };

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests;
