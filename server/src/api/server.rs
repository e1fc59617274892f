//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use super::middleware::{self, AllowedOrigins};
use super::routes::{health, rooms};
use crate::app::ChatApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    app: ChatApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: ChatApp) -> Self {
        let allowed_origins = AllowedOrigins::new(app.config.cors.allowed_origins.clone());
        Self { app, allowed_origins }
    }

    /// Returns the app so the caller can run graceful shutdown.
    pub async fn start(self) -> Result<ChatApp> {
        let Self { app, allowed_origins } = self;

        let shutdown = app.shutdown.clone();
        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let health_routes = Router::new()
            .route("/api/healthz", get(health::healthz))
            .with_state(app.controller.clone());

        let router = Router::new()
            .merge(health_routes)
            .merge(rooms::routes(app.controller.clone()))
            .fallback(middleware::handle_404)
            .layer(CompressionLayer::new())
            .layer(middleware::cors(&allowed_origins))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
