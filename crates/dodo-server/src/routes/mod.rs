pub mod categories;
pub mod habits;
pub mod profile;
pub mod tasks;

use axum::Json;
use serde::Serialize;

pub const SERVICE_NAME: &str = "dodo-api";

#[derive(Serialize)]
pub struct RootResponse {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
