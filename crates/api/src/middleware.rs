//! Request middleware: bearer authentication and per-client rate limiting.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};

use paksa_auth::TokenValidator;

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn TokenValidator>,
}

/// Require a valid access token; inserts [`CurrentUser`] into the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or_else(|| {
        ApiError::Unauthorized("Not authenticated".to_string())
    })?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::credentials()
    })?;

    req.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(req).await)
}

/// Like [`auth_middleware`], but anonymous requests pass through.
///
/// A token that is present but invalid is still rejected.
pub async fn optional_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.headers().contains_key(header::AUTHORIZATION) {
        let token = extract_bearer(req.headers()).ok_or_else(ApiError::credentials)?;
        let claims = state
            .jwt
            .validate(token, Utc::now())
            .map_err(|_| ApiError::credentials())?;
        req.extensions_mut().insert(CurrentUser::from(claims));
    }
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

type IpLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// GCRA limiter keyed by client IP: `limit` requests per `period`.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<IpLimiter>,
    clock: DefaultClock,
}

impl RateLimitState {
    /// `None` when `limit` or `period` is zero.
    pub fn new(limit: u32, period: Duration) -> Option<Self> {
        let burst = NonZeroU32::new(limit)?;
        let quota = Quota::with_period(period / limit)?.allow_burst(burst);
        Some(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
        })
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Forget clients whose quota has fully recovered.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Prune every `interval` until the returned task is aborted.
    pub fn spawn_pruner(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                state.prune();
                tracing::debug!(clients = state.tracked_clients(), "rate limiter pruned");
            }
        })
    }

    /// Seconds to wait when `ip` is over its quota.
    fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        })
    }
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    match state.check(ip) {
        Ok(()) => next.run(req).await,
        Err(retry_after_secs) => {
            tracing::warn!(%ip, retry_after_secs, "rate limit exceeded");
            ApiError::RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            }
            .into_response()
        }
    }
}

/// Peer address, then the first `X-Forwarded-For` hop, then unspecified.
fn client_ip(req: &Request) -> IpAddr {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
