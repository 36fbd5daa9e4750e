//! # HTTP Server
//!
//! Combines the resource routers under `/api/v1` and serves them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{JwtConfig, JwtManager, PasswordPolicy};
use crate::config::AppConfig;
use crate::geo::Geocoder;
use crate::store::DocumentStore;
use crate::uploads::PhotoStore;

use super::{auth_routes, bootcamps, courses, reviews, users, API_PREFIX};

/// State shared by every handler
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub jwt: JwtManager,
    pub photos: PhotoStore,
    pub password_policy: PasswordPolicy,
}

/// Shared state type
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn Geocoder>,
        jwt_config: JwtConfig,
        photos: PhotoStore,
    ) -> Self {
        Self {
            store,
            geocoder,
            jwt: JwtManager::new(jwt_config),
            photos,
            password_policy: PasswordPolicy::default(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self::new(
            store,
            geocoder,
            config.jwt_config(),
            PhotoStore::new(config.upload_dir.clone(), config.max_file_upload),
        )
    }
}

/// HTTP server for the bootcamp directory API
pub struct ApiServer {
    addr: String,
    router: Router,
}

impl ApiServer {
    pub fn new(config: &AppConfig, state: AppState) -> Self {
        Self {
            addr: config.socket_addr(),
            router: Self::build_router(Arc::new(state), &config.cors_origins),
        }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
        let cors = if cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let api = Router::new()
            .merge(bootcamps::routes(state.photos.max_size()))
            .merge(courses::routes())
            .merge(reviews::routes())
            .nest("/auth", auth_routes::routes())
            .merge(users::routes());

        Router::new()
            .nest(API_PREFIX, api)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(state)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> &str {
        &self.addr
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start serving until the process stops
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.addr, e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, prefix = API_PREFIX, "campdir listening");
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
