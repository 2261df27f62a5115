use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::OriginalUri;
use axum::routing::get;
use axum::{Json, Router};
use booking::BookingModule;
use chrono::{SecondsFormat, Utc};
use corekit_errors::{StatusRegistry, catalog};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::HostConfig;
use crate::middleware::{self, X_REQUEST_ID};

/// Connected, migrated service ready to be served.
pub struct App {
    pub router: Router,
    pub registry: Arc<StatusRegistry>,
    pub booking: BookingModule,
    /// Parent of every request context; cancelling it aborts in-flight
    /// database work.
    pub abort: CancellationToken,
}

impl App {
    /// Connect each module to its database, apply migrations and assemble
    /// the routes. Server settings come from the global configuration.
    ///
    /// # Errors
    /// Fails when a database is unreachable or a migration fails.
    pub async fn build(host: &HostConfig) -> Result<Self> {
        let cfg = host.module(BookingModule::NAME);
        ensure_sqlite_dir(&cfg.database.dsn)?;
        let booking = BookingModule::init(&cfg.database)
            .await
            .with_context(|| format!("starting module '{}'", BookingModule::NAME))?;
        tracing::info!(
            module = BookingModule::NAME,
            engine = ?booking.db().engine(),
            dsn = %booking.db().dsn(),
            "module database ready"
        );

        let registry = Arc::new(StatusRegistry::with_defaults());
        BookingModule::register_errors(&registry);
        tracing::debug!(codes = registry.len(), "status registry ready");

        let abort = CancellationToken::new();
        let router = Router::new()
            .route("/", get(health))
            .route("/health", get(health));
        let router = booking.register_routes(router, Arc::clone(&registry));
        let router = with_fallback(router, Arc::clone(&registry));
        let router = apply_layers(router, host.global.server.request_timeout, &abort);

        Ok(Self {
            router,
            registry,
            booking,
            abort,
        })
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

fn with_fallback(router: Router, registry: Arc<StatusRegistry>) -> Router {
    router.fallback(move |OriginalUri(uri): OriginalUri| {
        let registry = Arc::clone(&registry);
        async move {
            registry
                .problem(&catalog::NOT_FOUND.error_with("no route for this path"))
                .with_instance(uri.path())
        }
    })
}

/// Request flow: context installation, then tracing, then the routes. Each
/// request context is a child of `abort`.
#[must_use]
pub fn apply_layers(
    router: Router,
    request_timeout: Duration,
    abort: &CancellationToken,
) -> Router {
    use tracing::field::Empty;

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                    let rid = req
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri().path(),
                        request_id = %rid,
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<axum::body::Body>,
                     latency: Duration,
                     span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record("latency_ms", latency.as_millis());
                    },
                ),
        )
        .layer(axum::middleware::from_fn({
            let abort = abort.clone();
            move |req, next| {
                middleware::install_context(request_timeout, abort.child_token(), req, next)
            }
        }))
}

/// Serve until `cancel` fires, then drain in-flight requests for at most
/// `server.shutdown_timeout`. Requests still running after that are aborted
/// before the module pools close.
///
/// # Errors
/// Fails when startup fails or the listener errors.
pub async fn serve(host: &HostConfig, cancel: &CancellationToken) -> Result<()> {
    let server_cfg = &host.global.server;
    let app = App::build(host).await?;
    let listener = tokio::net::TcpListener::bind(&server_cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", server_cfg.bind_addr))?;
    tracing::info!("HTTP server bound on {}", listener.local_addr()?);

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        }
    };
    let server = axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown)
        .into_future();
    let drain_limit = server_cfg.shutdown_timeout;

    let served = tokio::select! {
        res = server => res.context("HTTP server failed"),
        () = async {
            cancel.cancelled().await;
            tokio::time::sleep(drain_limit).await;
        } => {
            tracing::warn!(?drain_limit, "shutdown timeout elapsed, aborting in-flight requests");
            Ok(())
        }
    };
    app.abort.cancel();

    match app.booking.close().await {
        Ok(()) => {
            tracing::info!(module = BookingModule::NAME, "database connection closed gracefully");
        }
        Err(e) => tracing::error!(
            module = BookingModule::NAME,
            error = %e,
            "failed to close database connection"
        ),
    }
    served?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Create the parent directory of a file-backed `SQLite` DSN.
fn ensure_sqlite_dir(dsn: &str) -> Result<()> {
    let Some(rest) = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    Ok(())
}
