use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{
    Features, LICENSE_FORMAT_VERSION, LicenseData, decode_key, default_features, feature_truthy,
    sign,
};
use crate::error::LicenseError;

/// Longest license term `generate_license` accepts (100 years).
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

/// Outcome of a license check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStatus {
    pub valid: bool,
    pub message: String,
}

impl LicenseStatus {
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: "License is valid".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Issues and verifies licenses for one installation.
///
/// `secret` signs licenses; `hardware_signature` identifies this machine
/// (see [`crate::hardware_signature`]).
#[derive(Debug, Clone)]
pub struct LicenseManager {
    license_key: Option<String>,
    license_data: Option<LicenseData>,
    secret: String,
    hardware_signature: String,
}

impl LicenseManager {
    pub fn new(
        license_key: Option<String>,
        secret: impl Into<String>,
        hardware_signature: impl Into<String>,
    ) -> Self {
        let license_key = license_key.filter(|k| !k.trim().is_empty());
        let license_data = match license_key.as_deref().map(decode_key) {
            Some(Ok(data)) => Some(data),
            Some(Err(e)) => {
                tracing::error!(error = %e, "license key could not be decoded");
                None
            }
            None => None,
        };

        Self {
            license_key,
            license_data,
            secret: secret.into(),
            hardware_signature: hardware_signature.into(),
        }
    }

    pub fn license_key(&self) -> Option<&str> {
        self.license_key.as_deref()
    }

    pub fn license_data(&self) -> Option<&LicenseData> {
        self.license_data.as_ref()
    }

    pub fn hardware_signature(&self) -> &str {
        &self.hardware_signature
    }

    fn generate_license_id(customer_name: &str, now: DateTime<Utc>) -> String {
        let seed = format!("{customer_name}-{}-{}", now.to_rfc3339(), uuid::Uuid::new_v4());
        hex::encode(Sha256::digest(seed.as_bytes()))
    }

    /// Issue a signed license bound to this machine.
    pub fn generate_license(
        &self,
        customer_name: &str,
        customer_email: &str,
        expiry_days: i64,
        max_users: u32,
        features: Option<Features>,
        now: DateTime<Utc>,
    ) -> Result<LicenseData, LicenseError> {
        let invalid_expiry = LicenseError::InvalidExpiry {
            days: expiry_days,
            max: MAX_EXPIRY_DAYS,
        };
        if !(1..=MAX_EXPIRY_DAYS).contains(&expiry_days) {
            return Err(invalid_expiry);
        }
        let now = now.trunc_subsecs(0);
        let expiry_date = now
            .checked_add_signed(Duration::days(expiry_days))
            .ok_or(invalid_expiry)?;
        let mut data = LicenseData {
            license_id: Self::generate_license_id(customer_name, now),
            customer_name: customer_name.to_string(),
            customer_email: customer_email.to_string(),
            issue_date: now,
            expiry_date,
            max_users,
            features: features
                .filter(|f| !f.is_empty())
                .unwrap_or_else(default_features),
            hardware_bound: true,
            hardware_signature: Some(self.hardware_signature.clone()),
            version: LICENSE_FORMAT_VERSION.to_string(),
            signature: String::new(),
        };
        data.signature = sign(&data, &self.secret)?;
        Ok(data)
    }

    /// Verify the configured license at `now`.
    ///
    /// Checks run in order: presence, format, signature, expiry, hardware.
    pub fn check_license(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.license_key.is_none() {
            return LicenseStatus::invalid("No license key provided");
        }
        let Some(data) = &self.license_data else {
            return LicenseStatus::invalid("Invalid license key format");
        };
        if !data.verify_signature(&self.secret) {
            return LicenseStatus::invalid("License signature is invalid");
        }
        if data.is_expired(now) {
            return LicenseStatus::invalid("License has expired");
        }
        if data.hardware_bound
            && data.hardware_signature.as_deref() != Some(self.hardware_signature.as_str())
        {
            return LicenseStatus::invalid("License is not valid for this hardware");
        }
        LicenseStatus::valid()
    }

    /// Features of the configured license, empty unless it currently verifies.
    pub fn features(&self, now: DateTime<Utc>) -> Features {
        match &self.license_data {
            Some(data) if self.check_license(now).valid => data.features.clone(),
            _ => Features::new(),
        }
    }

    pub fn is_feature_enabled(&self, feature: &str, now: DateTime<Utc>) -> bool {
        self.features(now).get(feature).is_some_and(feature_truthy)
    }
}
