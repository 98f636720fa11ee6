use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointMap,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EndpointMap {
    pub status: &'static str,
    pub health: &'static str,
    pub calls_init: &'static str,
    pub calls_webhook: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: i64,
}

pub fn router() -> Router {
    Router::new().route("/", get(root)).route("/health", get(health)).route("/status", get(status))
}

async fn root() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        message: "Haggler Agent API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointMap {
            status: "/status",
            health: "/health",
            calls_init: "/calls/init",
            calls_webhook: "/calls/webhook",
        },
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        message: "Server is running",
        timestamp: Utc::now().timestamp(),
    })
}
