use std::sync::Arc;

use axum::{Json, extract::Extension};
use chrono::Utc;

use crate::app::dto::LicenseValidResponse;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn validate(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<LicenseValidResponse>, ApiError> {
    let status = services.license.validate(Utc::now()).await;
    if !status.valid {
        return Err(ApiError::LicenseInvalid(status.message));
    }
    Ok(Json(LicenseValidResponse {
        status: "valid".to_string(),
        message: status.message,
    }))
}
