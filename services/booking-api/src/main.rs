//! Horae Booking API
//!
//! Booking platform service: provider availability, the booking
//! lifecycle with checkout payments, the payment webhook, and the
//! recording session pipeline.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/providers/{id}/slots?date=` - Free slot starts for a day
//! - `GET /api/v1/providers/{id}/availability` - List availability windows
//! - `POST /api/v1/availability` - Add a window to the caller's calendar
//! - `DELETE /api/v1/availability/{id}` - Remove a window
//! - `POST /api/v1/bookings` - Create a booking
//! - `GET /api/v1/bookings/{id}` - Get a booking
//! - `POST /api/v1/bookings/{id}/cancel` - Cancel a booking
//! - `POST /api/v1/bookings/{id}/checkout` - Open a checkout session
//! - `POST /api/v1/bookings/{id}/start` - Mark the appointment in progress
//! - `POST /api/v1/bookings/{id}/no-show` - Mark a no-show
//! - `POST /api/v1/bookings/{id}/session` - Open the recording session
//! - `GET /api/v1/sessions/{id}` - Get a session
//! - `POST /api/v1/sessions/{id}/consents` - Grant a consent
//! - `GET /api/v1/sessions/{id}/recording-authorization` - Consent gate state
//! - `POST /api/v1/sessions/{id}/recording/start` - Begin recording
//! - `POST /api/v1/sessions/{id}/recording` - Upload and process a recording
//! - `POST /api/v1/sessions/{id}/summary` - Validate the summary
//! - `POST /api/v1/sessions/{id}/reset` - Wipe the pipeline output
//! - `POST /webhooks/payments` - Payment gateway webhook
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod extractors;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use horae_booking_core::{
    AvailabilityService, BookingService, PaymentReconciler, StripeGateway, WebhookHandler,
};
use horae_db::Repositories;
use horae_session_core::{HttpObjectStore, HttpTranscriber, SessionService};

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("booking_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Horae Booking API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, "Configuration loaded");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool and apply migrations
    let pool = horae_db::create_pool(&config.database_url).await?;
    horae_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created");

    // Create repositories
    let repos = Repositories::new(pool.clone());
    let users = Arc::new(repos.users.clone());
    let windows = Arc::new(repos.availability.clone());
    let bookings_repo = Arc::new(repos.bookings.clone());

    // Core services
    let availability =
        AvailabilityService::new(users.clone(), windows.clone(), bookings_repo.clone());
    let gateway = Arc::new(StripeGateway::new(config.payment.clone()));
    let bookings = BookingService::new(
        users,
        windows,
        bookings_repo.clone(),
        gateway,
        config.payment.clone(),
    );
    let reconciler = PaymentReconciler::new(
        bookings_repo.clone(),
        WebhookHandler::new(config.payment.webhook_secret.clone()),
    );
    let sessions = SessionService::new(
        bookings_repo,
        Arc::new(repos.sessions.clone()),
        Arc::new(repos.consents.clone()),
        Arc::new(repos.moments.clone()),
        Arc::new(HttpObjectStore::new(config.object_store_url.clone())),
        Arc::new(HttpTranscriber::new(
            config.transcriber_url.clone(),
            config.transcriber_api_key.clone(),
        )),
        config.session.clone(),
    );

    // Create application state
    let state = AppState::new(
        availability,
        bookings,
        reconciler,
        sessions,
        repos,
        pool,
        config.clone(),
    );

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    // Start server
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));

    tokio::select! {
        result = run_http_server(app, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = ?e, "HTTP server error");
            }
        }
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();
    let recording_timeout = state.recording_timeout();
    let max_upload_bytes = state.config.max_upload_bytes;

    // API v1 routes under the ordinary request timeout
    let api_v1 = Router::new()
        // Availability routes
        .route("/providers/{id}/slots", get(handlers::get_slots))
        .route("/providers/{id}/availability", get(handlers::list_windows))
        .route("/availability", post(handlers::create_window))
        .route("/availability/{id}", delete(handlers::delete_window))
        // Booking routes
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/{id}", get(handlers::get_booking))
        .route("/bookings/{id}/cancel", post(handlers::cancel_booking))
        .route("/bookings/{id}/checkout", post(handlers::create_checkout))
        .route("/bookings/{id}/start", post(handlers::start_booking))
        .route("/bookings/{id}/no-show", post(handlers::mark_no_show))
        .route("/bookings/{id}/session", post(handlers::open_session))
        // Session routes
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/consents", post(handlers::grant_consent))
        .route(
            "/sessions/{id}/recording-authorization",
            get(handlers::recording_authorization),
        )
        .route(
            "/sessions/{id}/recording/start",
            post(handlers::start_recording),
        )
        .route("/sessions/{id}/summary", post(handlers::validate_summary))
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        .layer(TimeoutLayer::new(request_timeout));

    // The recording upload runs the pipeline inline, so it gets its own
    // minutes-scale timeout and a larger body limit.
    let recording_route = Router::new()
        .route(
            "/sessions/{id}/recording",
            post(handlers::upload_recording),
        )
        .layer(TimeoutLayer::new(recording_timeout))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes = Router::new()
        .route("/webhooks/payments", post(handlers::payment_webhook))
        .layer(TimeoutLayer::new(request_timeout));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Middleware stack, outermost first. Timeouts are attached
    // per-subrouter above because the recording route needs its own.
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .nest("/api/v1", api_v1.merge(recording_route))
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Latency buckets sized for booking operations; slot computation and
    // checkout creation should land well under a second
    let booking_latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("booking_operation_duration_seconds".to_string()),
        booking_latency_buckets,
    )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!("bookings_created_total", "Total bookings created");
    metrics::describe_counter!("bookings_cancelled_total", "Total bookings cancelled");
    metrics::describe_counter!(
        "payment_webhooks_processed_total",
        "Total payment webhooks processed by status"
    );
    metrics::describe_counter!(
        "session_recordings_processed_total",
        "Total recording uploads by pipeline outcome"
    );
    metrics::describe_histogram!(
        "booking_operation_duration_seconds",
        "Booking operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
