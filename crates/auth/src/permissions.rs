use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::UserRole;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "users.create"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const USERS_CREATE: Permission = Permission(Cow::Borrowed("users.create"));
    pub const CHAT_USE: Permission = Permission(Cow::Borrowed("chat.use"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role → permission policy.
pub fn permissions_for(role: UserRole) -> Vec<Permission> {
    match role {
        UserRole::Admin => vec![Permission::WILDCARD],
        UserRole::Manager => vec![Permission::USERS_CREATE, Permission::CHAT_USE],
        UserRole::Agent | UserRole::Customer => vec![Permission::CHAT_USE],
    }
}
