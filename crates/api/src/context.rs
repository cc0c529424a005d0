use paksa_auth::{TokenClaims, UserRole};
use paksa_core::UserId;

/// Authenticated caller of a request, taken from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    user_id: UserId,
    username: String,
    role: UserRole,
    scopes: Vec<String>,
}

impl CurrentUser {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.uid,
            username: claims.sub,
            role: claims.role,
            scopes: claims.scopes,
        }
    }
}
