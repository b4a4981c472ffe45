use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use eventhook_remote::{DynSessionFactory, RemoteError};
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig, create_session_factory, dispatcher::EventDispatcher, handlers,
    middleware as app_middleware,
};

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    /// Scheme assumed when deriving endpoints from requests without proxy headers.
    pub scheme: Arc<str>,
}

pub struct EventhookServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, sessions: DynSessionFactory) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let state = AppState {
        dispatcher: Arc::new(EventDispatcher::new(sessions, &cfg.reconcile)),
        scheme: Arc::from(cfg.server.scheme.to_ascii_lowercase()),
    };

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Remote event protocol
        .route("/events", post(handlers::process_event))
        .route("/events/one-way", post(handlers::process_one_way_event))
        .with_state(state)
        // Middleware stack, innermost first: trace -> request id -> body limit.
        // The request id must wrap the trace layer for the span to see it.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    sessions: Option<DynSessionFactory>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            sessions: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use a specific session factory instead of the one named by `remote.backend`.
    pub fn with_session_factory(mut self, sessions: DynSessionFactory) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> Result<EventhookServer, RemoteError> {
        let sessions = match self.sessions {
            Some(sessions) => sessions,
            None => create_session_factory(&self.config.remote)?,
        };
        let app = build_app(&self.config, sessions);

        Ok(EventhookServer {
            addr: self.addr,
            app,
        })
    }
}

impl EventhookServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
