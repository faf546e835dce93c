use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use dotenvy::dotenv;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 7] = [
    "http://localhost:3000",
    "http://localhost:3001",
    "http://192.168.1.57:3000",
    "https://www.24carrental.in",
    "https://24carrental.in",
    "http://www.24carrental.in",
    "http://24carrental.in",
];

/// Production enforces the CORS allow-list; anything else is permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum RunMode {
    Production,
    #[default]
    Development,
}

impl From<String> for RunMode {
    fn from(value: String) -> Self {
        if value == "production" {
            RunMode::Production
        } else {
            RunMode::Development
        }
    }
}

impl From<RunMode> for String {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Production => "production".to_string(),
            RunMode::Development => "development".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub frontend_url: Option<String>,
}

impl CorsConfig {
    /// The configured allow-list plus `frontend_url` when it is set.
    pub fn origins(&self) -> Vec<String> {
        let mut origins = self.allowed_origins.clone();
        if let Some(url) = self.frontend_url.as_deref().filter(|u| !u.is_empty()) {
            origins.push(url.to_string());
        }
        origins
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RealtimeConfig {
    /// Events queued per connection before delivery to it fails.
    pub outbound_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub realtime: RealtimeConfig,
    pub mode: RunMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                addr: "0.0.0.0".to_string(),
                port: 4000,
                body_limit_bytes: 50 * 1024 * 1024,
            },
            cors: CorsConfig {
                allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
                frontend_url: None,
            },
            database: DatabaseConfig {
                url: "sqlite://car_rental.db".to_string(),
                max_connections: 5,
            },
            realtime: RealtimeConfig {
                outbound_buffer: 64,
            },
            mode: RunMode::Development,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, figment::Error> {
        dotenv().ok();

        let config: Self = Self::figment().extract()?;

        tracing::info!("Configuration loaded successfully, full config: {:?}", config);

        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("Config.toml")) // For non-sensitive defaults
            .merge(Env::prefixed("APP_").split("__")) // e.g., APP_WEB__PORT
            .merge(
                // Plain variables understood by existing deployments.
                Env::raw()
                    .only(&["PORT", "FRONTEND_URL", "NODE_ENV"])
                    .map(|key| {
                        let key = key.as_str();
                        if key.eq_ignore_ascii_case("port") {
                            "web.port".into()
                        } else if key.eq_ignore_ascii_case("frontend_url") {
                            "cors.frontend_url".into()
                        } else {
                            "mode".into()
                        }
                    }),
            )
    }

    pub fn is_production(&self) -> bool {
        self.mode == RunMode::Production
    }
}
