//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection (user store, cache, mail, license, AI)
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: HTTP-only request/response bodies
//! - `errors.rs`: consistent error responses

use std::path::Path;
use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use paksa_config::{CorsOrigins, Settings};

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

pub const STATIC_DIR: &str = "static";

/// Build the full HTTP router from settings (public entrypoint used by `main.rs`).
pub async fn build_app(settings: Settings) -> anyhow::Result<Router> {
    let services = build_services(settings).await?;
    Ok(build_app_with(Arc::new(services)))
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring unusable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        }
    }
}

/// Build the router around already-wired services.
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    let settings = services.settings.clone();
    let prefix = settings.api_prefix.trim_end_matches('/').to_string();
    let p = |path: &str| format!("{prefix}{path}");

    let auth_state = AuthState {
        jwt: services.tokens.clone(),
    };

    // Bearer token required.
    let protected = Router::new()
        .route(&p("/users/me"), get(routes::users::me).patch(routes::users::update_me))
        .route(&p("/users/me/"), get(routes::users::me).patch(routes::users::update_me))
        .route(&p("/chat"), post(routes::chat::chat))
        .route(&p("/chat/history"), delete(routes::chat::clear_history))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            middleware::auth_middleware,
        ));

    // Bearer token optional (anonymous customer sign-up).
    let optional = Router::new()
        .route(&p("/users"), post(routes::users::create_user))
        .route(&p("/users/"), post(routes::users::create_user))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::optional_auth_middleware,
        ));

    let mut public = Router::new()
        .route(&p("/"), get(routes::system::root))
        .route(&p("/auth/token"), post(routes::auth::login))
        .route(&p("/auth/refresh"), post(routes::auth::refresh))
        .route(
            &p("/auth/password-reset/request"),
            post(routes::auth::request_password_reset),
        )
        .route(&p("/auth/password-reset"), post(routes::auth::reset_password))
        .route(&p("/license/validate"), get(routes::license::validate));
    if !prefix.is_empty() {
        public = public.route(&prefix, get(routes::system::root));
    }

    let mut api = public.merge(optional).merge(protected);
    match services.rate_limit.clone() {
        Some(limiter) => {
            api = api.layer(axum::middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::warn!("rate limiting disabled"),
    }

    let mut app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(api);
    if Path::new(STATIC_DIR).is_dir() {
        app = app.nest_service("/static", ServeDir::new(STATIC_DIR));
    }

    app.layer(Extension(services)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&settings.cors_origins)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use tower::Layer;

    #[test]
    fn cors_rules_are_usable() {
        let svc = tower::service_fn(|_: axum::extract::Request| async {
            Ok::<_, std::convert::Infallible>(axum::response::Response::new(
                axum::body::Body::empty(),
            ))
        });
        // tower-http panics when credentials are combined with wildcard rules.
        let _ = cors_layer(&CorsOrigins::List(vec!["https://shop.example".into()]))
            .layer(svc.clone());
        let _ = cors_layer(&CorsOrigins::Any).layer(svc);
    }
}
