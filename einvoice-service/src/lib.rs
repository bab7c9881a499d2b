pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{FbrClient, InMemoryInvoiceRepository, InvoiceRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn InvoiceRepository>,
    pub fbr: FbrClient,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let repository: Arc<dyn InvoiceRepository> = Arc::new(InMemoryInvoiceRepository::new());

        let fbr = FbrClient::new(config.fbr.clone())?;
        if fbr.is_enabled() {
            tracing::info!(environment = %config.fbr.environment, "FBR client initialized");
        } else {
            tracing::warn!("FBR integration disabled - submissions will be skipped");
        }

        let state = AppState {
            config: config.clone(),
            repository,
            fbr,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/invoices", post(handlers::invoices::create_invoice))
            .route("/invoices/:id", get(handlers::invoices::get_invoice))
            .route(
                "/invoices/:id/submit",
                post(handlers::invoices::submit_invoice),
            )
            .route("/invoices/:id/qr", get(handlers::invoices::invoice_qr))
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random free port; the integration tests rely on it.
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;

        Ok(())
    }
}
