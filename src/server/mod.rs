use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use crate::config::StackConfig;

pub mod api;
pub mod routes;

pub fn run_server(bind_addr: &str, config: StackConfig) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(bind_addr, config))
}

pub async fn serve(bind_addr: &str, config: StackConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "stackmaker server listening");
    println!("stackmaker server listening on http://{bind_addr}");
    axum::serve(listener, router(config)).await
}

/// Every request goes through [routes::route_request]; the router only adds CORS.
pub fn router(config: StackConfig) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(cors_layer())
        .with_state(Arc::new(config))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

async fn dispatch(
    State(config): State<Arc<StackConfig>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let method = method.as_str().to_string();
    let path = uri.path().to_string();
    let log_path = path.clone();

    // Exact search is CPU-bound; keep it off the async workers.
    let routed = tokio::task::spawn_blocking(move || {
        routes::route_request(&method, &path, &body, &config)
    })
    .await;

    match routed {
        Ok(response) => {
            debug!(path = %log_path, status = response.status_code, "request handled");
            let status = StatusCode::from_u16(response.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, response.content_type)], response.body).into_response()
        }
        Err(err) => {
            error!(path = %log_path, error = %err, "request handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "request handler failed").into_response()
        }
    }
}
