use axum::http::{header, HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Origins used when none are configured: the web client's dev servers.
pub const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allowed_headers: vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT],
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    pub fn from_server_config(server: &ServerConfig) -> Self {
        let origins: Vec<String> = server
            .cors_origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() {
            info!("CORS using development origins (none configured)");
            Self::default()
        } else {
            info!("CORS configured with {} allowed origins", origins.len());
            Self {
                allowed_origins: origins,
                ..Self::default()
            }
        }
    }

    pub fn origin_values(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect()
    }

    pub fn build(self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origin_values()))
            .allow_methods(self.allowed_methods)
            .allow_headers(self.allowed_headers)
            .allow_credentials(self.allow_credentials)
            .max_age(Duration::from_secs(self.max_age_secs))
    }
}

pub fn create_cors_layer(server: &ServerConfig) -> CorsLayer {
    CorsConfig::from_server_config(server).build()
}
