//! License document, signing and key encoding.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::LicenseError;

pub const LICENSE_FORMAT_VERSION: &str = "1.0.0";

/// Feature flags and limits granted by a license.
pub type Features = BTreeMap<String, JsonValue>;

/// Feature set used when a license is generated without explicit features.
pub fn default_features() -> Features {
    let mut f = Features::new();
    f.insert("ai_chat".into(), JsonValue::Bool(true));
    f.insert("voice_support".into(), JsonValue::Bool(false));
    f.insert("api_access".into(), JsonValue::Bool(false));
    f.insert("max_requests_per_day".into(), JsonValue::from(1000));
    f
}

/// Interpret a feature value as on/off.
///
/// Booleans are taken as-is; numbers are on when non-zero, strings when
/// non-empty, arrays/objects when non-empty. `null` is off.
pub fn feature_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

/// A signed license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseData {
    pub license_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub max_users: u32,
    pub features: Features,
    pub hardware_bound: bool,
    #[serde(default)]
    pub hardware_signature: Option<String>,
    pub version: String,
    #[serde(default)]
    pub signature: String,
}

impl LicenseData {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    pub fn verify_signature(&self, secret: &str) -> bool {
        match sign(self, secret) {
            Ok(expected) => !self.signature.is_empty() && expected == self.signature,
            Err(_) => false,
        }
    }
}

/// Serialize a JSON value with object keys sorted at every level.
pub fn canonical_json(value: &JsonValue) -> String {
    fn canonicalize(value: &JsonValue) -> JsonValue {
        match value {
            JsonValue::Object(map) => {
                let sorted: BTreeMap<&String, JsonValue> =
                    map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
                let mut out = serde_json::Map::new();
                for (k, v) in sorted {
                    out.insert(k.clone(), v);
                }
                JsonValue::Object(out)
            }
            JsonValue::Array(items) => JsonValue::Array(items.iter().map(canonicalize).collect()),
            other => other.clone(),
        }
    }

    // Keys are inserted in sorted order, which serde_json keeps whether or
    // not `preserve_order` is enabled.
    canonicalize(value).to_string()
}

/// Signature over every field except `signature`, keyed by `secret`.
pub fn sign(data: &LicenseData, secret: &str) -> Result<String, LicenseError> {
    let mut value =
        serde_json::to_value(data).map_err(|e| LicenseError::Serialize(e.to_string()))?;
    if let JsonValue::Object(map) = &mut value {
        map.remove("signature");
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&value).as_bytes());
    hasher.update(secret.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Encode a license into the opaque key handed to customers.
pub fn encode_key(data: &LicenseData) -> Result<String, LicenseError> {
    let json = serde_json::to_vec(data).map_err(|e| LicenseError::Serialize(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

pub fn decode_key(key: &str) -> Result<LicenseData, LicenseError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(key.trim())
        .map_err(|e| LicenseError::InvalidKey(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| LicenseError::InvalidKey(e.to_string()))
}
