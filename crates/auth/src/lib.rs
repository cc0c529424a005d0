//! `paksa-auth` - authentication and authorization boundary.
//!
//! Token issuing/verification, password hashing, roles and the user account
//! models. This crate knows nothing about HTTP or storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize, authorize_scopes};
pub use claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};
pub use jwt::{JwtCodec, TokenError, TokenValidator};
pub use password::{
    PasswordError, hash_fingerprint, hash_password, validate_password_strength, verify_password,
};
pub use permissions::{Permission, permissions_for};
pub use roles::UserRole;
pub use user::{
    PasswordReset, PasswordResetRequest, RefreshRequest, Token, TokenData, UserCreate, UserLogin,
    UserRecord, UserUpdate, UserView,
};
