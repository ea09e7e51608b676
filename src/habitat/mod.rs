//! HTTP API: routing, middleware and the server loop.

use crate::{auth::Authenticator, store::Store};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod openapi;

use handlers::{blog, devices, hamsters, health, login, profile, readings, register, root, users};

const REQUEST_ID: &str = "x-request-id";

/// Turn a configured frontend URL into a CORS origin (`scheme://host[:port]`).
///
/// # Errors
/// Returns an error if the value is not an absolute http(s) URL.
pub fn frontend_origin(value: &str) -> Result<HeaderValue> {
    let url = Url::parse(value.trim()).context("Invalid frontend origin")?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        anyhow::bail!("Frontend origin must be an http(s) URL with a host");
    }
    HeaderValue::from_str(&url.origin().ascii_serialization())
        .context("Invalid frontend origin")
}

/// Build the application router.
///
/// CORS is only enabled when a frontend origin is configured.
pub fn router(
    auth: Arc<Authenticator>,
    store: Arc<dyn Store>,
    frontend_origin: Option<HeaderValue>,
) -> Router {
    let api = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/profile", get(profile::profile))
        .route("/users", get(users::list_users))
        .route(
            "/devices",
            get(devices::list_devices).post(devices::create_device),
        )
        .route(
            "/devices/:id",
            get(devices::get_device)
                .put(devices::update_device)
                .delete(devices::delete_device),
        )
        .route(
            "/devices/:id/readings",
            get(readings::list_readings).post(readings::record_reading),
        )
        .route(
            "/hamsters",
            get(hamsters::list_hamsters).post(hamsters::create_hamster),
        )
        .route("/blog", get(blog::blog))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        );

    let api = match frontend_origin {
        Some(origin) => api.layer(
            CorsLayer::new()
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
        ),
        None => api,
    };

    api.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth))
            .layer(Extension(store)),
    )
}

/// Serve the API until ctrl-c.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!("http-request", %method, path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path() -> Result<()> {
        assert_eq!(
            frontend_origin("https://app.habitat.dev/dashboard/")?,
            HeaderValue::from_static("https://app.habitat.dev")
        );
        assert_eq!(
            frontend_origin("http://localhost:5173")?,
            HeaderValue::from_static("http://localhost:5173")
        );
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_non_http() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("ftp://files.habitat.dev").is_err());
    }
}
