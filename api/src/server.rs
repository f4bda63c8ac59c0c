use crate::{create_router, AppState};
use axum::http::{header, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Single allowed browser origin; any origin when `None`
    pub cors_origin: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            cors_origin: None,
        }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Restrict CORS to one origin
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }
}

/// CORS policy for the configured origin. An origin that is not a valid
/// header value falls back to permissive with a warning.
pub fn build_cors(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin.map(str::trim).filter(|o| !o.is_empty()) else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(Duration::from_secs(86400)),
        Err(e) => {
            warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            CorsLayer::permissive()
        }
    }
}

/// Start the API server and run until Ctrl-C
pub async fn start_server(state: AppState, config: ApiConfig) -> std::io::Result<()> {
    let app = create_router(state, build_cors(config.cors_origin.as_deref()));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    info!("Swagger UI available at http://localhost:{}/api/v1/swagger", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ApiConfig::new()
            .with_port(8080)
            .with_cors_origin(Some("https://example.com".into()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origin.as_deref(), Some("https://example.com"));
        assert_eq!(ApiConfig::default().port, 3030);
    }

    #[test]
    fn test_build_cors_accepts_any_input() {
        let _ = build_cors(None);
        let _ = build_cors(Some("  "));
        let _ = build_cors(Some("https://promise.example"));
        let _ = build_cors(Some("bad\norigin"));
    }
}
