use thiserror::Error;

use crate::{Permission, UserRole, permissions_for};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that `role` carries `required`.
///
/// Pure policy check: no IO, no panics.
pub fn authorize(role: UserRole, required: &Permission) -> Result<(), AuthzError> {
    let granted = permissions_for(role)
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Same check against the scope list carried in a token.
pub fn authorize_scopes(scopes: &[String], required: &Permission) -> Result<(), AuthzError> {
    if scopes.iter().any(|s| s == "*" || s == required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
