use std::{sync::Arc, time::Instant};

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{from_fn, Next},
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Level;

use crate::app_state::AppState;

pub mod chain_signatures_api;
pub mod handlers;
pub mod response; // 统一响应格式

/// 构建全部路由
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::api_health))
        .route("/api/v1/chains", get(handlers::list_chains))
        .route(
            "/api/v1/chain-signatures/status",
            get(chain_signatures_api::get_status),
        )
        .route(
            "/api/v1/chain-signatures/:account_id/addresses",
            get(chain_signatures_api::list_derived_addresses),
        )
        .route(
            "/api/v1/chain-signatures/:account_id/addresses/:chain",
            get(chain_signatures_api::get_derived_address),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(from_fn(trace_log)),
        )
        .with_state(state)
}

async fn trace_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let mut resp = next.run(req).await;

    let elapsed = start.elapsed().as_millis();
    if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
        resp.headers_mut().insert("x-response-time-ms", value);
    }
    tracing::event!(
        Level::INFO,
        method = %method,
        path = %path,
        status = %resp.status().as_u16(),
        elapsed_ms = %elapsed,
        "http_request"
    );
    resp
}
