use std::sync::Arc;

use axum::{Json, extract::Extension};

use crate::app::dto::{API_VERSION, HealthResponse, WelcomeResponse};
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: services.settings.app_name.clone(),
        version: API_VERSION.to_string(),
    })
}

pub async fn root(Extension(services): Extension<Arc<AppServices>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to {} API", services.settings.app_name),
        version: API_VERSION.to_string(),
        documentation: "/docs".to_string(),
    })
}
