//! Who is invoking an operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::PrincipalId;

/// The originator of a host request.
///
/// `Host` is the host itself: its own fixed logic, and any module code that
/// re-enters the host while running inside it. Everything else is an
/// external `Principal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Caller {
    /// The host itself.
    Host,
    /// An external caller.
    Principal(PrincipalId),
}

impl Caller {
    /// Shorthand for an external caller.
    #[must_use]
    pub fn principal(id: PrincipalId) -> Self {
        Self::Principal(id)
    }

    /// Whether this caller is the host itself.
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// The external principal, if any.
    #[must_use]
    pub fn principal_id(&self) -> Option<&PrincipalId> {
        match self {
            Self::Host => None,
            Self::Principal(id) => Some(id),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Principal(id) => write!(f, "principal:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_display() {
        assert_eq!(Caller::Host.to_string(), "host");
        let caller = Caller::principal(PrincipalId::from_static("alice"));
        assert_eq!(caller.to_string(), "principal:alice");
        assert!(!caller.is_host());
        assert_eq!(caller.principal_id().map(PrincipalId::as_str), Some("alice"));
    }

    #[test]
    fn test_caller_serialization() {
        let json = serde_json::to_string(&Caller::Host).unwrap();
        assert_eq!(json, r#"{"kind":"host"}"#);

        let parsed: Caller = serde_json::from_str(r#"{"kind":"principal","id":"bob"}"#).unwrap();
        assert_eq!(parsed, Caller::Principal(PrincipalId::from_static("bob")));
    }
}
