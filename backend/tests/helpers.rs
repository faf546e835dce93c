// backend/tests/helpers.rs
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use backend::{
    bootstrap,
    config::{AppConfig, DatabaseConfig, RunMode},
    realtime::{DeliveryError, EventSink},
    web_server::AppState,
};
use common::ServerEvent;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::net::TcpListener;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Config pointing at a private in-memory database.
pub fn test_config(mode: RunMode) -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            // Every connection to `sqlite::memory:` is its own database.
            max_connections: 1,
        },
        mode,
        ..AppConfig::default()
    }
}

/// Migrated and seeded state, no listener.
pub async fn test_state(config: &AppConfig) -> AppState {
    init_tracing();
    let db_pool = bootstrap::init_dependencies(config)
        .await
        .expect("Failed to initialize in-memory database.");
    AppState::new(db_pool, config)
}

/// Spawn a test server and return the address, a reqwest client and the state
/// shared with the server.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, AppState) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = test_config(RunMode::Development);
    let app_state = test_state(&config).await;
    let app = backend::web_server::create_router(app_state.clone(), &config);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, app_state)
}

/// In-process sink recording what the gateway hands it.
#[derive(Default)]
pub struct TestSink {
    pub events: Mutex<Vec<Arc<ServerEvent>>>,
    pub fail: bool,
}

impl TestSink {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn events(&self) -> Vec<ServerEvent> {
        self.events
            .lock()
            .iter()
            .map(|e| e.as_ref().clone())
            .collect()
    }
}

impl EventSink for TestSink {
    fn deliver(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Closed);
        }
        self.events.lock().push(event);
        Ok(())
    }
}
