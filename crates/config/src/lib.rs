//! `paksa-config` - typed application settings.
//!
//! Settings come from the process environment, optionally seeded from a `.env`
//! file in the working directory. Every key is parsed and validated once at
//! startup; the rest of the service only sees [`Settings`].

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{AppEnv, CorsOrigins, JwtAlgorithm, LogFormat, Settings};
