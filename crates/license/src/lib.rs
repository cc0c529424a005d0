//! `paksa-license` - software licensing.
//!
//! A license is a signed JSON document handed to customers as an opaque key
//! (`LICENSE_KEY`). Verification is local (signature, expiry, hardware
//! binding) with an optional remote check against `LICENSE_VALIDATION_URL`.

pub mod document;
pub mod error;
pub mod hardware;
pub mod manager;
pub mod remote;

pub use document::{Features, LicenseData, decode_key, default_features, encode_key, sign};
pub use error::LicenseError;
pub use hardware::{
    SystemInfo, current_hardware_id, hardware_id, hardware_signature, validate_hardware_id,
};
pub use manager::{LicenseManager, LicenseStatus, MAX_EXPIRY_DAYS};
pub use remote::{LicenseService, REMOTE_CHECK_INTERVAL, RemoteValidator};
