use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placeholder secret used when none is configured. Rejected in production.
pub const DEV_SECRET: &str = "dev-secret-change-me";

pub const DEFAULT_APP_NAME: &str = "Paksa AI Assistant";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Upper bounds for token lifetimes (ten years).
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 10 * 365 * 24 * 60;
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 10 * 365;

/// Deployment environment (`APP_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Staging,
    Production,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Staging => "staging",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        }
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "staging" => Ok(AppEnv::Staging),
            "production" | "prod" => Ok(AppEnv::Production),
            "test" | "testing" => Ok(AppEnv::Test),
            _ => Err("expected one of: development, staging, production, test".to_string()),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HMAC algorithm used to sign tokens (`JWT_ALGORITHM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::Hs256),
            "HS384" => Ok(JwtAlgorithm::Hs384),
            "HS512" => Ok(JwtAlgorithm::Hs512),
            _ => Err("only HS256, HS384 and HS512 are supported".to_string()),
        }
    }
}

/// Log output format (`LOG_FORMAT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            _ => Err("expected 'json' or 'text'".to_string()),
        }
    }
}

/// Allowed CORS origins (`CORS_ORIGINS`).
///
/// Accepts `*`, a comma separated list, or a JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl FromStr for CorsOrigins {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(CorsOrigins::Any);
        }

        let origins: Vec<String> = if s.starts_with('[') {
            serde_json::from_str::<Vec<String>>(s).map_err(|e| format!("invalid JSON list: {e}"))?
        } else {
            s.split(',').map(|o| o.trim().to_string()).collect()
        };

        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.iter().any(|o| o == "*") {
            return Ok(CorsOrigins::Any);
        }
        if let Some(bad) = origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(format!("origin '{bad}' must start with http:// or https://"));
        }
        if origins.is_empty() {
            return Ok(CorsOrigins::Any);
        }
        Ok(CorsOrigins::List(origins))
    }
}

/// Outgoing mail server settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully parsed application settings.
#[derive(Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_env: AppEnv,
    pub debug: bool,
    pub secret_key: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,

    pub database_url: Option<String>,
    pub database_test_url: Option<String>,

    pub redis_url: Option<String>,
    pub redis_cache_ttl_secs: u64,

    pub jwt_secret_key: String,
    pub jwt_algorithm: JwtAlgorithm,
    pub jwt_access_token_expire_minutes: i64,
    pub jwt_refresh_token_expire_days: i64,

    pub smtp: SmtpSettings,
    pub email_from: String,

    pub cors_origins: CorsOrigins,
    pub rate_limit: u32,
    pub rate_limit_period_secs: u64,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,

    pub log_level: String,
    pub log_format: LogFormat,

    pub license_key: Option<String>,
    pub license_validation_url: Option<String>,
    pub license_secret: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_name", &self.app_name)
            .field("app_env", &self.app_env)
            .field("debug", &self.debug)
            .field("api_prefix", &self.api_prefix)
            .field("bind", &self.bind_addr())
            .field("database", &self.database_url.is_some())
            .field("redis", &self.redis_url.is_some())
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("smtp", &self.smtp)
            .field("cors_origins", &self.cors_origins)
            .field("rate_limit", &self.rate_limit)
            .field("rate_limit_period_secs", &self.rate_limit_period_secs)
            .field("model_name", &self.model_name)
            .field("assistant_enabled", &self.openai_api_key.is_some())
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("licensed", &self.license_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Typed reads over a key lookup. Empty values count as unset.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn opt(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.opt(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, raw.clone(), e.to_string())),
        }
    }

    fn bool(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.opt(key) {
            None => Ok(default),
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid(key, raw.clone(), "expected true/false, 1/0, yes/no or on/off")
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    if !raw.starts_with('/') {
        return Err(ConfigError::invalid("API_PREFIX", raw, "must start with '/'"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    ///
    /// Variables already set in the environment win over `.env` entries.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::DotEnv(e.to_string())),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an in-memory map (tests, embedding).
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let secret_key = env.string("SECRET_KEY", DEV_SECRET);
        let jwt_secret_key = env.opt("JWT_SECRET_KEY").unwrap_or_else(|| secret_key.clone());

        let settings = Settings {
            app_name: env.string("APP_NAME", DEFAULT_APP_NAME),
            app_env: env.parse("APP_ENV", AppEnv::Development)?,
            debug: env.bool("DEBUG", false)?,
            secret_key,
            api_prefix: normalize_prefix(&env.string("API_PREFIX", DEFAULT_API_PREFIX))?,
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8000u16)?,

            database_url: env.opt("DATABASE_URL"),
            database_test_url: env.opt("DATABASE_TEST_URL"),

            redis_url: env.opt("REDIS_URL"),
            redis_cache_ttl_secs: env.parse("REDIS_CACHE_TTL", 300u64)?,

            jwt_secret_key,
            jwt_algorithm: env.parse("JWT_ALGORITHM", JwtAlgorithm::Hs256)?,
            jwt_access_token_expire_minutes: env.parse("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", 30i64)?,
            jwt_refresh_token_expire_days: env.parse("JWT_REFRESH_TOKEN_EXPIRE_DAYS", 7i64)?,

            smtp: SmtpSettings {
                server: env.opt("SMTP_SERVER"),
                port: env.parse("SMTP_PORT", 587u16)?,
                user: env.opt("SMTP_USER"),
                password: env.opt("SMTP_PASSWORD"),
            },
            email_from: env.string("EMAIL_FROM", "noreply@paksa.com.pk"),

            cors_origins: env.parse("CORS_ORIGINS", CorsOrigins::Any)?,
            rate_limit: env.parse("RATE_LIMIT", 100u32)?,
            rate_limit_period_secs: env.parse("RATE_LIMIT_PERIOD", 60u64)?,

            openai_api_key: env.opt("OPENAI_API_KEY"),
            openai_base_url: env
                .string("OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            model_name: env.string("MODEL_NAME", "gpt-3.5-turbo"),
            temperature: env.parse("TEMPERATURE", 0.7f32)?,
            max_tokens: env.parse("MAX_TOKENS", 1000u32)?,

            log_level: env.string("LOG_LEVEL", "INFO"),
            log_format: env.parse("LOG_FORMAT", LogFormat::Json)?,

            license_key: env.opt("LICENSE_KEY"),
            license_validation_url: env.opt("LICENSE_VALIDATION_URL"),
            license_secret: env.string("LICENSE_SECRET", DEV_SECRET),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Range checks and production hardening rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&self.jwt_access_token_expire_minutes) {
            return Err(ConfigError::invalid(
                "JWT_ACCESS_TOKEN_EXPIRE_MINUTES",
                self.jwt_access_token_expire_minutes.to_string(),
                format!("must be between 1 and {MAX_ACCESS_TOKEN_MINUTES}"),
            ));
        }
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&self.jwt_refresh_token_expire_days) {
            return Err(ConfigError::invalid(
                "JWT_REFRESH_TOKEN_EXPIRE_DAYS",
                self.jwt_refresh_token_expire_days.to_string(),
                format!("must be between 1 and {MAX_REFRESH_TOKEN_DAYS}"),
            ));
        }
        if self.rate_limit == 0 {
            return Err(ConfigError::invalid("RATE_LIMIT", "0", "must be positive"));
        }
        if self.rate_limit_period_secs == 0 {
            return Err(ConfigError::invalid("RATE_LIMIT_PERIOD", "0", "must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "TEMPERATURE",
                self.temperature.to_string(),
                "must be between 0 and 2",
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("MAX_TOKENS", "0", "must be positive"));
        }
        if let Some(url) = &self.license_validation_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "LICENSE_VALIDATION_URL",
                    url.clone(),
                    "must be an http(s) URL",
                ));
            }
        }

        if self.is_production() {
            for (key, value) in [
                ("SECRET_KEY", &self.secret_key),
                ("JWT_SECRET_KEY", &self.jwt_secret_key),
                ("LICENSE_SECRET", &self.license_secret),
            ] {
                if value == DEV_SECRET {
                    return Err(ConfigError::Insecure {
                        key,
                        reason: "must be set explicitly in production".to_string(),
                    });
                }
            }
            if self.debug {
                tracing::warn!("DEBUG is enabled in production");
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_access_token_expire_minutes as u64 * 60)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_refresh_token_expire_days as u64 * 24 * 60 * 60)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.redis_cache_ttl_secs)
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_secs)
    }

    /// Whether the AI assistant can be wired (an API key is configured).
    pub fn assistant_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}
