//! Token issuing, refresh and password reset.

use std::sync::Arc;

use axum::{Form, Json, extract::Extension, http::StatusCode};
use chrono::{DateTime, Duration, Utc};

use paksa_auth::{
    PasswordReset, PasswordResetRequest, RefreshRequest, Token, TokenClaims, TokenKind,
    UserRecord, hash_fingerprint, hash_password, validate_password_strength, verify_password,
};
use paksa_infra::{Email, invalidate};

use crate::app::dto::{LoginForm, MessageResponse};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, profile_cache_key};

pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

fn ttl(d: std::time::Duration) -> Duration {
    Duration::seconds(d.as_secs() as i64)
}

/// Issue an access/refresh pair for `user`.
///
/// The refresh token carries the password fingerprint, so changing the
/// password revokes it.
fn issue_tokens(
    services: &AppServices,
    user: &UserRecord,
    now: DateTime<Utc>,
) -> Result<Token, ApiError> {
    let settings = &services.settings;
    let access = TokenClaims::new(
        TokenKind::Access,
        &user.username,
        user.id,
        user.role,
        now,
        ttl(settings.access_token_ttl()),
    )
    .map_err(ApiError::internal)?;
    let refresh = TokenClaims::new(
        TokenKind::Refresh,
        &user.username,
        user.id,
        user.role,
        now,
        ttl(settings.refresh_token_ttl()),
    )
    .map_err(ApiError::internal)?
    .with_password_fingerprint(hash_fingerprint(&user.hashed_password));

    let access_token = services.tokens.issue(&access).map_err(ApiError::internal)?;
    let refresh_token = services.tokens.issue(&refresh).map_err(ApiError::internal)?;
    Ok(Token::bearer(
        access_token,
        Some(refresh_token),
        access.lifetime_secs(),
    ))
}

/// Whether `claims` were issued against the user's current password.
fn matches_password(claims: &TokenClaims, user: &UserRecord) -> bool {
    claims.pwd.as_deref() == Some(hash_fingerprint(&user.hashed_password).as_str())
}

/// OAuth2 password grant.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<Token>, ApiError> {
    let incorrect = || ApiError::Unauthorized("Incorrect username or password".to_string());

    let user = services
        .users
        .get_by_username(&form.username)
        .await?
        .ok_or_else(incorrect)?;

    if !verify_password(&form.password, &user.hashed_password).map_err(ApiError::internal)? {
        tracing::info!(username = %form.username, "failed login");
        return Err(incorrect());
    }
    if !user.is_active() {
        return Err(ApiError::inactive_user());
    }

    let now = Utc::now();
    services.users.record_login(user.id, now).await?;
    invalidate(services.cache.as_ref(), &profile_cache_key(user.id)).await;

    tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(Json(issue_tokens(&services, &user, now)?))
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<Token>, ApiError> {
    let now = Utc::now();
    let claims = services
        .tokens
        .decode(&body.refresh_token, TokenKind::Refresh, now)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected refresh token");
            ApiError::credentials()
        })?;

    let user = services
        .users
        .get(claims.uid)
        .await?
        .ok_or_else(ApiError::credentials)?;
    if !matches_password(&claims, &user) {
        tracing::info!(user_id = %user.id, "refresh token predates a password change");
        return Err(ApiError::credentials());
    }
    if !user.is_active() {
        return Err(ApiError::inactive_user());
    }

    Ok(Json(issue_tokens(&services, &user, now)?))
}

/// Start a password reset.
///
/// Always answers 202 so the response does not reveal whether an account exists.
pub async fn request_password_reset(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PasswordResetRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let accepted = (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the email is registered, password reset instructions have been sent",
        )),
    );

    let user = match services.users.get_by_email(&body.email).await {
        Ok(Some(user)) if user.is_active() => user,
        Ok(_) => return accepted,
        Err(e) => {
            tracing::error!(error = %e, "password reset lookup failed");
            return accepted;
        }
    };

    let now = Utc::now();
    let claims = TokenClaims::new(
        TokenKind::PasswordReset,
        &user.username,
        user.id,
        user.role,
        now,
        Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    )
    .map(|c| c.with_password_fingerprint(hash_fingerprint(&user.hashed_password)));

    let token = match claims.and_then(|c| services.tokens.issue(&c)) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue reset token");
            return accepted;
        }
    };

    let email = Email {
        to: user.email.clone(),
        subject: format!("{} password reset", services.settings.app_name),
        body: format!(
            "Hello {},\n\nUse this token to reset your password. It expires in \
             {RESET_TOKEN_TTL_MINUTES} minutes.\n\n{token}\n",
            user.full_name.as_deref().unwrap_or(&user.username),
        ),
    };
    if let Err(e) = services.mailer.send(email).await {
        tracing::error!(user_id = %user.id, error = %e, "failed to send reset email");
    }
    accepted
}

/// Complete a password reset. A token stops working once the password changed.
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PasswordReset>,
) -> Result<Json<MessageResponse>, ApiError> {
    let invalid = || ApiError::BadRequest(INVALID_RESET_TOKEN.to_string());
    let now = Utc::now();

    let claims = services
        .tokens
        .decode(&body.token, TokenKind::PasswordReset, now)
        .map_err(|_| invalid())?;
    let user = services.users.get(claims.uid).await?.ok_or_else(invalid)?;
    if !matches_password(&claims, &user) {
        return Err(invalid());
    }

    validate_password_strength(&body.new_password)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let hashed = hash_password(&body.new_password)?;
    services.users.set_password(user.id, hashed, now).await?;
    invalidate(services.cache.as_ref(), &profile_cache_key(user.id)).await;

    tracing::info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset")))
}
