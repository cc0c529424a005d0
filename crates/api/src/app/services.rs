//! Service wiring: picks storage, cache, mail, licensing and AI backends from
//! [`Settings`].

use std::sync::Arc;

use anyhow::Context;
use jsonwebtoken::Algorithm;

use paksa_assistant::{OpenAiChatClient, SupportAssistant};
use paksa_auth::JwtCodec;
use paksa_config::{JwtAlgorithm, Settings};
use paksa_infra::{
    Cache, InMemoryCache, InMemoryUserStore, LogMailer, Mailer, PostgresUserStore, RedisCache,
    SmtpMailer, UserStore,
};
use paksa_license::{
    LicenseManager, LicenseService, RemoteValidator, current_hardware_id, hardware_signature,
};

use crate::middleware::RateLimitState;

/// Everything request handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub settings: Arc<Settings>,
    pub users: Arc<dyn UserStore>,
    pub cache: Arc<dyn Cache>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: Arc<JwtCodec>,
    pub license: Arc<LicenseService>,
    pub assistant: Option<Arc<SupportAssistant>>,
    /// Per-client limiter; `None` disables rate limiting.
    pub rate_limit: Option<RateLimitState>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("app_env", &self.settings.app_env)
            .field("assistant", &self.assistant.is_some())
            .field("rate_limited", &self.rate_limit.is_some())
            .finish_non_exhaustive()
    }
}

pub fn jwt_algorithm(alg: JwtAlgorithm) -> Algorithm {
    match alg {
        JwtAlgorithm::Hs256 => Algorithm::HS256,
        JwtAlgorithm::Hs384 => Algorithm::HS384,
        JwtAlgorithm::Hs512 => Algorithm::HS512,
    }
}

pub fn token_codec(settings: &Settings) -> anyhow::Result<JwtCodec> {
    JwtCodec::new(&settings.jwt_secret_key, jwt_algorithm(settings.jwt_algorithm))
        .context("invalid JWT configuration")
}

/// License service for this machine, with the remote check when configured.
pub fn license_service(settings: &Settings) -> anyhow::Result<LicenseService> {
    let manager = LicenseManager::new(
        settings.license_key.clone(),
        settings.license_secret.clone(),
        hardware_signature(&current_hardware_id()),
    );
    let remote = settings
        .license_validation_url
        .as_deref()
        .map(RemoteValidator::new)
        .transpose()
        .context("failed to build license validation client")?;
    Ok(LicenseService::new(manager, remote))
}

pub fn support_assistant(settings: &Settings) -> anyhow::Result<Option<SupportAssistant>> {
    let Some(api_key) = settings.openai_api_key.as_deref() else {
        tracing::info!("OPENAI_API_KEY not set; AI assistant disabled");
        return Ok(None);
    };
    let client = OpenAiChatClient::new(
        &settings.openai_base_url,
        api_key,
        settings.model_name.clone(),
        settings.temperature,
        settings.max_tokens,
    )
    .context("failed to build chat model client")?;
    Ok(Some(SupportAssistant::new(Arc::new(client))))
}

async fn user_store(settings: &Settings) -> anyhow::Result<Arc<dyn UserStore>> {
    match settings.database_url.as_deref() {
        Some(url) => {
            let store = PostgresUserStore::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            tracing::info!("using Postgres user store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

async fn cache(settings: &Settings) -> Arc<dyn Cache> {
    if let Some(url) = settings.redis_url.as_deref() {
        match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("using Redis cache");
                return Arc::new(cache);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; falling back to in-memory cache");
            }
        }
    }
    Arc::new(InMemoryCache::new())
}

/// SMTP when `SMTP_SERVER` is set, otherwise mail is only logged.
pub fn mailer(settings: &Settings) -> anyhow::Result<Arc<dyn Mailer>> {
    let smtp = &settings.smtp;
    let Some(server) = smtp.server.as_deref() else {
        tracing::warn!("SMTP_SERVER not set; emails are logged, not delivered");
        return Ok(Arc::new(LogMailer::new(settings.email_from.clone())));
    };

    let credentials = match (&smtp.user, &smtp.password) {
        (Some(user), Some(password)) => Some((user.clone(), password.clone())),
        (None, None) => None,
        _ => anyhow::bail!("SMTP_USER and SMTP_PASSWORD must be set together"),
    };
    let mailer = SmtpMailer::new(server, smtp.port, credentials, &settings.email_from)
        .context("invalid SMTP configuration")?;
    tracing::info!(server, port = smtp.port, "using SMTP mailer");
    Ok(Arc::new(mailer))
}

/// Build services from settings.
///
/// Without `DATABASE_URL` / `REDIS_URL` everything runs in memory.
pub async fn build_services(settings: Settings) -> anyhow::Result<AppServices> {
    let tokens = token_codec(&settings)?;
    let license = license_service(&settings)?;
    let assistant = support_assistant(&settings)?.map(Arc::new);
    let users = user_store(&settings).await?;
    let cache = cache(&settings).await;
    let mailer = mailer(&settings)?;
    let rate_limit = RateLimitState::new(settings.rate_limit, settings.rate_limit_period());

    Ok(AppServices {
        settings: Arc::new(settings),
        users,
        cache,
        mailer,
        tokens: Arc::new(tokens),
        license: Arc::new(license),
        assistant,
        rate_limit,
    })
}

pub fn profile_cache_key(user: paksa_core::UserId) -> String {
    format!("user:{user}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_map(&map).unwrap()
    }

    #[test]
    fn smtp_settings_select_the_mailer() {
        assert!(mailer(&settings(&[])).is_ok());
        assert!(mailer(&settings(&[("SMTP_SERVER", "smtp.example.com")])).is_ok());
        assert!(
            mailer(&settings(&[
                ("SMTP_SERVER", "smtp.example.com"),
                ("SMTP_PORT", "465"),
                ("SMTP_USER", "mailer"),
                ("SMTP_PASSWORD", "hunter2"),
            ]))
            .is_ok()
        );
    }

    #[test]
    fn smtp_credentials_come_in_pairs() {
        let err = mailer(&settings(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_USER", "mailer"),
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().contains("SMTP_USER and SMTP_PASSWORD"));

        let err = mailer(&settings(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("EMAIL_FROM", "not an address"),
        ]))
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "invalid SMTP configuration");
    }
}
