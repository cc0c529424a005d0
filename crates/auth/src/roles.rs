use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of an account within the support system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Agent,
    #[default]
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Agent => "agent",
            UserRole::Customer => "customer",
        }
    }

    /// Whether an actor holding `self` may create or promote an account to `target`.
    ///
    /// Admins grant anything, managers grant staff roles below their own,
    /// everyone else can only produce customers.
    pub fn can_grant(&self, target: UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Manager => matches!(target, UserRole::Agent | UserRole::Customer),
            UserRole::Agent | UserRole::Customer => target == UserRole::Customer,
        }
    }
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "agent" => Ok(UserRole::Agent),
            "customer" => Ok(UserRole::Customer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"manager\"");
        let role: UserRole = serde_json::from_str("\"agent\"").unwrap();
        assert_eq!(role, UserRole::Agent);
    }

    #[test]
    fn default_is_customer() {
        assert_eq!(UserRole::default(), UserRole::Customer);
    }

    #[test]
    fn grant_matrix_prevents_escalation() {
        assert!(UserRole::Admin.can_grant(UserRole::Admin));
        assert!(UserRole::Manager.can_grant(UserRole::Agent));
        assert!(!UserRole::Manager.can_grant(UserRole::Manager));
        assert!(!UserRole::Manager.can_grant(UserRole::Admin));
        assert!(!UserRole::Agent.can_grant(UserRole::Agent));
        assert!(UserRole::Customer.can_grant(UserRole::Customer));
    }
}
