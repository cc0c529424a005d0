//! Optional license server check.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LicenseError;
use crate::manager::{LicenseManager, LicenseStatus};

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    license_key: &'a str,
    hardware_signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    valid: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Client for `LICENSE_VALIDATION_URL`.
///
/// POSTs `{license_key, hardware_signature}` and expects `{valid, message}`.
#[derive(Debug, Clone)]
pub struct RemoteValidator {
    client: reqwest::Client,
    url: String,
}

impl RemoteValidator {
    pub fn new(url: impl Into<String>) -> Result<Self, LicenseError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LicenseError::Remote(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn validate(
        &self,
        license_key: &str,
        hardware_signature: &str,
    ) -> Result<LicenseStatus, LicenseError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ValidationRequest {
                license_key,
                hardware_signature,
            })
            .send()
            .await
            .map_err(|e| LicenseError::Remote(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LicenseError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: ValidationResponse = resp
            .json()
            .await
            .map_err(|e| LicenseError::Remote(e.to_string()))?;

        Ok(match (body.valid, body.message) {
            (true, Some(m)) => LicenseStatus { valid: true, message: m },
            (true, None) => LicenseStatus::valid(),
            (false, m) => LicenseStatus::invalid(
                m.unwrap_or_else(|| "License was rejected by the license server".to_string()),
            ),
        })
    }
}

/// How long a license server verdict is reused before asking again.
pub const REMOTE_CHECK_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct RemoteVerdict {
    status: LicenseStatus,
    checked_at: Instant,
}

/// Local verification plus the optional remote check.
///
/// The last license server answer is kept; while it says the license is
/// invalid, every licensed feature is off.
#[derive(Debug)]
pub struct LicenseService {
    manager: LicenseManager,
    remote: Option<RemoteValidator>,
    check_interval: Duration,
    last_remote: RwLock<Option<RemoteVerdict>>,
}

impl LicenseService {
    pub fn new(manager: LicenseManager, remote: Option<RemoteValidator>) -> Self {
        Self {
            manager,
            remote,
            check_interval: REMOTE_CHECK_INTERVAL,
            last_remote: RwLock::new(None),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn manager(&self) -> &LicenseManager {
        &self.manager
    }

    fn last_verdict(&self, max_age: Option<Duration>) -> Option<LicenseStatus> {
        let guard = self.last_remote.read().ok()?;
        let verdict = guard.as_ref()?;
        match max_age {
            Some(age) if verdict.checked_at.elapsed() >= age => None,
            _ => Some(verdict.status.clone()),
        }
    }

    fn remember(&self, status: &LicenseStatus) {
        if let Ok(mut guard) = self.last_remote.write() {
            *guard = Some(RemoteVerdict {
                status: status.clone(),
                checked_at: Instant::now(),
            });
        }
    }

    /// Validate the installed license.
    ///
    /// A locally invalid license is never sent to the server. A recent server
    /// verdict is reused; when the server cannot be reached the last verdict
    /// stands, or the local one if there is none.
    pub async fn validate(&self, now: DateTime<Utc>) -> LicenseStatus {
        let local = self.manager.check_license(now);
        if !local.valid {
            return local;
        }

        let (Some(remote), Some(key)) = (&self.remote, self.manager.license_key()) else {
            return local;
        };
        if let Some(status) = self.last_verdict(Some(self.check_interval)) {
            return status;
        }

        match remote.validate(key, self.manager.hardware_signature()).await {
            Ok(status) => {
                if !status.valid {
                    tracing::warn!(message = %status.message, "license rejected by license server");
                }
                self.remember(&status);
                status
            }
            Err(e) => {
                tracing::warn!(url = remote.url(), error = %e, "license server check failed; keeping last verdict");
                self.last_verdict(None).unwrap_or(local)
            }
        }
    }

    /// Whether `feature` is granted by a license that currently validates.
    pub async fn is_feature_enabled(&self, feature: &str, now: DateTime<Utc>) -> bool {
        self.validate(now).await.valid && self.manager.is_feature_enabled(feature, now)
    }
}
