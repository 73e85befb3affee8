use crate::config::Config;
use crate::service::ConversionService;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docconv_common::{Error, Format};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub mod error;

use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<ConversionService>,
    pub config: Arc<Config>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION])
        .expose_headers([header::CONTENT_DISPOSITION]);

    let body_limit = ctx.config.server.max_body_bytes;

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/formats", get(list_formats))
        .route("/convert/format/:dest_format", post(convert))
        .with_state(ctx);

    // Landing page plus any other assets next to it
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app
                .route_service("/", ServeFile::new(&index_path))
                .fallback_service(ServeDir::new(&dir));
        }
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(env!("CARGO_PKG_NAME")),
        ))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn list_formats(State(ctx): State<AppContext>) -> Json<Vec<Format>> {
    Json(ctx.service.formats().iter().cloned().collect())
}

async fn convert(
    State(ctx): State<AppContext>,
    Path(dest_format): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let disposition = match headers.get(header::CONTENT_DISPOSITION) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| Error::malformed("header is not valid ASCII"))?,
        ),
    }
    .filter(|value| !value.trim().is_empty());

    let document = ctx
        .service
        .convert(disposition, &dest_format, &body)
        .await?;

    let content_type = HeaderValue::from_str(&document.content_type)
        .map_err(|e| Error::internal(format!("invalid content type: {e}")))?;
    let content_disposition = HeaderValue::from_str(&document.content_disposition())
        .map_err(|e| Error::internal(format!("invalid download filename: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        document.data,
    )
        .into_response())
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_server(config: Config, service: Arc<ConversionService>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext {
        service: Arc::clone(&service),
        config: Arc::new(config),
    };
    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
