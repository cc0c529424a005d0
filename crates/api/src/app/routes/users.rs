//! Account creation and self-service profile.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};
use chrono::Utc;

use paksa_auth::{
    Permission, UserCreate, UserRecord, UserRole, UserUpdate, UserView, authorize, hash_password,
};
use paksa_infra::{get_json, invalidate, set_json};

use crate::app::errors::ApiError;
use crate::app::services::{AppServices, profile_cache_key};
use crate::context::CurrentUser;

/// The caller's account, rejecting deleted and disabled users.
pub(crate) async fn load_active(services: &AppServices, current: &CurrentUser) -> Result<UserRecord, ApiError> {
    let user = services
        .users
        .get(current.user_id())
        .await?
        .ok_or_else(ApiError::credentials)?;
    if !user.is_active() {
        return Err(ApiError::inactive_user());
    }
    Ok(user)
}

/// Profile of the caller, served from cache when possible.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserView>, ApiError> {
    let key = profile_cache_key(current.user_id());
    if let Some(view) = get_json::<UserView>(services.cache.as_ref(), &key).await {
        if view.disabled {
            return Err(ApiError::inactive_user());
        }
        return Ok(Json(view));
    }

    let view = load_active(&services, &current).await?.view();
    set_json(
        services.cache.as_ref(),
        &key,
        &view,
        services.settings.cache_ttl(),
    )
    .await;
    Ok(Json(view))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserView>, ApiError> {
    update.validate()?;
    if update.disabled.is_some() && current.role() != UserRole::Admin {
        return Err(ApiError::Forbidden(
            "Only administrators can change the disabled flag".to_string(),
        ));
    }

    let mut user = load_active(&services, &current).await?;
    if !user.apply_update(&update, Utc::now()) {
        return Ok(Json(user.view()));
    }

    let user = services.users.update(user).await?;
    invalidate(services.cache.as_ref(), &profile_cache_key(user.id)).await;
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(user.view()))
}

/// Register an account.
///
/// Anyone may register a customer account. Other roles need a caller holding
/// `users.create` whose role may grant the requested one.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    current: Option<Extension<CurrentUser>>,
    Json(req): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    req.validate()?;

    if req.role != UserRole::Customer {
        let Some(Extension(current)) = current.as_ref() else {
            return Err(ApiError::Unauthorized(
                "Authentication required to create staff accounts".to_string(),
            ));
        };
        authorize(current.role(), &Permission::USERS_CREATE)?;
        if !current.role().can_grant(req.role) {
            return Err(ApiError::Forbidden(format!(
                "role '{}' cannot create '{}' accounts",
                current.role(),
                req.role
            )));
        }
    }

    let hashed = hash_password(&req.password)?;
    let record = UserRecord::from_create(&req, hashed, Utc::now());
    let user = services.users.insert(record).await?;

    tracing::info!(
        user_id = %user.id,
        role = %user.role,
        created_by = current.as_ref().map(|Extension(c)| c.username()).unwrap_or("self"),
        "user created"
    );
    Ok((StatusCode::CREATED, Json(user.view())))
}
