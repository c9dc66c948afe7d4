//! Permission checks.
//!
//! The host does not implement a role system. It asks an [`AccessControl`]
//! oracle whether a principal holds a permission and treats the answer as
//! final.

use std::collections::{HashMap, HashSet};

use modhost_core::{Caller, Permission, PrincipalId};

/// Boolean permission oracle.
pub trait AccessControl: Send + Sync {
    /// Whether `principal` holds `permission`.
    fn has_permission(&self, principal: &PrincipalId, permission: &Permission) -> bool;
}

impl<F> AccessControl for F
where
    F: Fn(&PrincipalId, &Permission) -> bool + Send + Sync,
{
    fn has_permission(&self, principal: &PrincipalId, permission: &Permission) -> bool {
        self(principal, permission)
    }
}

/// Grants nothing to anyone. Only the host itself can act.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessControl for DenyAll {
    fn has_permission(&self, _principal: &PrincipalId, _permission: &Permission) -> bool {
        false
    }
}

/// In-memory permission grants.
#[derive(Debug, Clone, Default)]
pub struct RoleGrants {
    grants: HashMap<PrincipalId, HashSet<Permission>>,
}

impl RoleGrants {
    /// Create an empty grant table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`grant`](Self::grant).
    #[must_use]
    pub fn with_grant(mut self, principal: PrincipalId, permission: Permission) -> Self {
        self.grant(principal, permission);
        self
    }

    /// Give `principal` a permission.
    pub fn grant(&mut self, principal: PrincipalId, permission: Permission) {
        self.grants.entry(principal).or_default().insert(permission);
    }

    /// Take a permission away. Returns `true` if it was held.
    pub fn revoke(&mut self, principal: &PrincipalId, permission: &Permission) -> bool {
        let Some(held) = self.grants.get_mut(principal) else {
            return false;
        };
        let removed = held.remove(permission);
        if held.is_empty() {
            self.grants.remove(principal);
        }
        removed
    }
}

impl AccessControl for RoleGrants {
    fn has_permission(&self, principal: &PrincipalId, permission: &Permission) -> bool {
        self.grants
            .get(principal)
            .is_some_and(|held| held.contains(permission))
    }
}

/// Whether `caller` satisfies `permission`. The host always does.
pub(crate) fn caller_has(
    access: &dyn AccessControl,
    caller: &Caller,
    permission: &Permission,
) -> bool {
    match caller {
        Caller::Host => true,
        Caller::Principal(principal) => access.has_permission(principal, permission),
    }
}
