use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};
use chrono::Utc;

use paksa_auth::{Permission, authorize_scopes};

use crate::app::dto::{ChatBody, ChatResponse};
use crate::app::errors::ApiError;
use crate::app::routes::users::load_active;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

pub const AI_CHAT_FEATURE: &str = "ai_chat";

async fn ensure_chat_allowed(
    services: &AppServices,
    current: &CurrentUser,
) -> Result<(), ApiError> {
    authorize_scopes(current.scopes(), &Permission::CHAT_USE)?;
    load_active(services, current).await?;
    if !services
        .license
        .is_feature_enabled(AI_CHAT_FEATURE, Utc::now())
        .await
    {
        return Err(ApiError::FeatureDisabled(
            "AI chat is not enabled by the current license".to_string(),
        ));
    }
    Ok(())
}

pub async fn chat(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    ensure_chat_allowed(&services, &current).await?;
    let assistant = services
        .assistant
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("AI assistant is not configured".to_string()))?;

    let reply = assistant.chat(current.user_id(), &body.message).await?;
    Ok(Json(ChatResponse {
        reply: reply.content,
        model: reply.model,
    }))
}

/// Forget the caller's conversation.
pub async fn clear_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    load_active(&services, &current).await?;
    if let Some(assistant) = &services.assistant {
        assistant.clear_history(current.user_id())?;
    }
    Ok(StatusCode::NO_CONTENT)
}
