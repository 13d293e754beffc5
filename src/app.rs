use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, movies};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(movies::router())
                .route("/health", get(|| async { "ok" })),
        )
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config.cors_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true),
            Err(_) => {
                warn!(origin, "CORS_ORIGIN is not a valid header value; allowing any origin");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
