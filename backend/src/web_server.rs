use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Json, Router,
};
use common::StatusResponse;
use tower_http::trace::TraceLayer;

use crate::{
    bookings,
    config::AppConfig,
    cors,
    db::DbPool,
    realtime::{self, ConnectionRegistry, DisconnectReason, PublishGateway},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub gateway: PublishGateway,
    pub outbound_buffer: usize,
}

impl AppState {
    /// Builds the state with a fresh connection registry behind the gateway.
    pub fn new(db_pool: DbPool, config: &AppConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            db_pool,
            gateway: PublishGateway::new(registry),
            outbound_buffer: config.realtime.outbound_buffer,
        }
    }
}

/// Binds on all configured interfaces and serves until Ctrl-C.
pub async fn run_server(app_state: AppState, config: &AppConfig) -> anyhow::Result<()> {
    let registry = Arc::clone(app_state.gateway.registry());
    let app = create_router(app_state, config);

    let bind_addr = format!("{}:{}", config.web.addr, config.web.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Car rental backend listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let dropped = realtime::drain(&registry, &DisconnectReason::ServerShutdown);
    tracing::info!("Server stopped, {} realtime connections dropped", dropped);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub fn create_router(app_state: AppState, config: &AppConfig) -> Router {
    let api_routes = Router::new()
        .route("/cars", get(bookings::list_cars))
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/{id}/status", patch(bookings::update_booking_status));

    Router::new()
        .route("/", get(root))
        .route("/ws", get(realtime::ws::ws_handler))
        .nest("/api", api_routes)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.web.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(config))
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "24 Car Rental backend".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
