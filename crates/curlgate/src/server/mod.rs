//! Task endpoint
//!
//! Routes:
//! - `/api/task/execute` (auth) - run a task, POST only
//! - `/api/system/info` (auth) - host memory and CPU usage
//! - `/api/health` - liveness
//!
//! Every failure becomes a `{success:false, message}` JSON body; a panicking
//! handler yields a 500 and the listener keeps serving.

mod handlers;
mod response;

pub use handlers::SystemInfo;
pub use response::{ApiError, ApiResponse};

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::auth::{self, AuthGate, SecureKey};
use crate::curl::CurlEngine;
use crate::error::{Error, Result};
use crate::limits::ClientLimits;
use crate::logging_impl::LogConfig;
use crate::network::HttpClient;
use crate::system::{ProcMetrics, SystemMetrics};

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: CurlEngine,
    pub metrics: Arc<dyn SystemMetrics>,
    pub log: LogConfig,
}

/// Assemble the full router: public and protected routes plus tracing,
/// panic containment and the body limit.
pub fn create_router(state: AppState, gate: AuthGate) -> Router {
    let body_limit = gate.max_body_bytes();

    let protected = Router::new()
        .route("/api/task/execute", any(handlers::execute_task))
        .route("/api/system/info", any(handlers::system_info))
        .route_layer(middleware::from_fn_with_state(
            gate,
            auth::require_secure_key,
        ));

    Router::new()
        .route("/api/health", any(handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false)),
        )
        .with_state(state)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Builder for a ready-to-serve [`Router`].
///
/// # Example
///
/// ```rust
/// use curlgate::{SecureKey, ServerBuilder};
///
/// # fn main() -> curlgate::Result<()> {
/// let router = ServerBuilder::new()
///     .secure_key(SecureKey::new("s3cret"))
///     .build()?;
/// # drop(router);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ServerBuilder {
    key: Option<SecureKey>,
    limits: ClientLimits,
    metrics: Option<Arc<dyn SystemMetrics>>,
    log: LogConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secret every protected request must present. Required.
    pub fn secure_key(mut self, key: SecureKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Timeouts and size ceilings.
    pub fn limits(mut self, limits: ClientLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Metrics source for `/api/system/info` (default: [`ProcMetrics`]).
    pub fn metrics(mut self, metrics: Arc<dyn SystemMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Log redaction settings.
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn build(self) -> Result<Router> {
        let key = self
            .key
            .ok_or_else(|| Error::Config("secure key is required".to_string()))?;
        let client = HttpClient::with_limits(&self.limits)?.log_config(self.log.clone());

        let state = AppState {
            engine: CurlEngine::new(client),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(ProcMetrics)),
            log: self.log,
        };
        let gate = AuthGate::new(key, self.limits.max_auth_body_bytes);
        Ok(create_router(state, gate))
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on {addr}");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
