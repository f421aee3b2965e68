use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bridge_core::orchestrator::Orchestrator;
use bridge_core::ports::{Gateway, MessageStore, Notifier};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod adapters;
mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;

use adapters::chatra::ChatraNotifier;
use adapters::openai::OpenAiGateway;
use adapters::postgres::PgMessageStore;
use config::Config;

/// How long in-flight webhook work may run after the listener stops.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chatra AI Bridge",
        version = "0.1.0",
        description = "Answers Chatra client messages through a four-stage LLM pipeline or hands them to an operator."
    ),
    paths(
        routes::health::health_check,
        routes::health::ping,
        routes::webhook::receive_webhook,
        routes::conversations::list_turns,
    ),
    components(schemas(
        HealthResponse,
        bridge_core::error::ApiError,
        bridge_core::turns::Turn,
        bridge_core::turns::Originator,
        routes::webhook::ChatraWebhook,
        routes::webhook::ChatraMessage,
        routes::webhook::ChatraClient,
        routes::conversations::ConversationTurnsResponse,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "webhook_secret",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new("X-Webhook-Secret"),
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bridge_api=debug,bridge_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let domain_knowledge = match config.load_domain_knowledge() {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn MessageStore> = Arc::new(PgMessageStore::new(pool));
    let gateway: Arc<dyn Gateway> = Arc::new(OpenAiGateway::new(&config.openai));
    let notifier: Arc<dyn Notifier> = Arc::new(ChatraNotifier::new(&config.chatra));
    let orchestrator = Orchestrator::new(
        store.clone(),
        gateway,
        notifier,
        config.pipeline(domain_knowledge),
    );

    tracing::info!(
        auto_delivery = config.auto_delivery,
        stage_timeout_secs = config.stage_timeout.as_secs(),
        webhook_secret = config.webhook_secret.is_some(),
        "Bridge configured"
    );

    let app_state = state::AppState {
        orchestrator: Arc::new(orchestrator),
        store,
        tasks: TaskTracker::new(),
        shutdown: CancellationToken::new(),
        webhook_secret: config.webhook_secret.clone(),
    };

    let cors_layer = middleware::cors::build_cors_layer(&config.cors_origins);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(
            routes::webhook::router(&app_state).layer(middleware::rate_limit::webhook_layer()),
        )
        .merge(
            routes::conversations::router(&app_state)
                .layer(middleware::rate_limit::read_layer()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Chatra bridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    drain(&app_state.tasks, &app_state.shutdown).await;
    tracing::info!("Chatra bridge stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, no longer accepting webhooks");
}

/// Let in-flight webhook work finish, cancelling whatever outlives the deadline.
async fn drain(tasks: &TaskTracker, shutdown: &CancellationToken) {
    tasks.close();
    if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, tasks.wait())
        .await
        .is_err()
    {
        tracing::warn!(pending = tasks.len(), "Drain deadline passed, cancelling webhook work");
        shutdown.cancel();
        tasks.wait().await;
    }
}
