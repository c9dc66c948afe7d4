//! Test fixtures for common types.

use std::sync::Arc;

use serde_json::json;

use modhost_core::{
    CallbackCatalog, CapabilityId, CatalogEntry, ModuleId, ModuleManifest, OperationId, Permission,
    PrincipalId, StaticHostDefinition,
};
use modhost_kernel::{ModuleError, ModuleHost, RoleGrants};

use crate::mocks::ScriptedModule;

/// Name of the fixture host type.
pub const TEST_HOST_NAME: &str = "test-token";

/// Create an operation id.
#[must_use]
pub fn op(id: &str) -> OperationId {
    OperationId::from_static(id)
}

/// Create a capability id.
#[must_use]
pub fn cap(id: &str) -> CapabilityId {
    CapabilityId::from_static(id)
}

/// Create a module id.
#[must_use]
pub fn module_id(id: &str) -> ModuleId {
    ModuleId::from_static(id)
}

/// Create a permission.
#[must_use]
pub fn permission(name: &str) -> Permission {
    Permission::from_static(name)
}

/// Create a principal id.
#[must_use]
pub fn principal(id: &str) -> PrincipalId {
    PrincipalId::from_static(id)
}

/// Catalog of a token-like host:
///
/// - `before_transfer`: required
/// - `before_mint`: optional
/// - `token_uri`: optional
/// - `on_royalty`: optional, non-reentrant
#[must_use]
pub fn test_catalog() -> CallbackCatalog {
    CallbackCatalog::new()
        .required(op("before_transfer"))
        .optional(op("before_mint"))
        .optional(op("token_uri"))
        .with_entry(op("on_royalty"), CatalogEntry::optional().non_reentrant())
}

/// Host definition using [`test_catalog`].
#[must_use]
pub fn test_definition() -> StaticHostDefinition {
    StaticHostDefinition::new(TEST_HOST_NAME, test_catalog())
}

/// A host built from [`test_definition`] with default settings.
#[must_use]
pub fn test_host() -> ModuleHost {
    ModuleHost::new(&test_definition())
}

/// A host with an arbitrary catalog.
#[must_use]
pub fn test_host_with_catalog(catalog: CallbackCatalog) -> ModuleHost {
    ModuleHost::new(&StaticHostDefinition::new(TEST_HOST_NAME, catalog))
}

/// Access control granting `installer` to `principal`.
#[must_use]
pub fn installer_grants(principal_id: &str) -> Arc<RoleGrants> {
    Arc::new(RoleGrants::new().with_grant(principal(principal_id), permission("installer")))
}

/// Access control from `(principal, permission)` pairs.
#[must_use]
pub fn grants(pairs: &[(&str, &str)]) -> Arc<RoleGrants> {
    let mut grants = RoleGrants::new();
    for (principal_id, name) in pairs {
        grants.grant(principal(principal_id), permission(name));
    }
    Arc::new(grants)
}

/// A module storing one value behind `set_value` / `get_value`.
///
/// `set_value` writes its argument under the `value` key and returns the
/// previous value; `get_value` returns the stored value or `null`.
#[must_use]
pub fn value_module(id: &str) -> ScriptedModule {
    ScriptedModule::new(id)
        .with_manifest(
            ModuleManifest::new()
                .provides(cap("value.store"))
                .fallback(op("set_value"))
                .fallback(op("get_value")),
        )
        .on("set_value", |args, ctx| {
            Ok(ctx.set("value", args)?.unwrap_or(json!(null)))
        })
        .on("get_value", |_, ctx| {
            Ok(ctx.get("value").cloned().unwrap_or(json!(null)))
        })
}

/// Second version of [`value_module`], adding `double_value`.
///
/// `double_value` doubles the stored integer in place and returns it.
#[must_use]
pub fn value_module_v2(id: &str) -> ScriptedModule {
    value_module(id)
        .with_manifest(
            ModuleManifest::new()
                .provides(cap("value.store"))
                .fallback(op("set_value"))
                .fallback(op("get_value"))
                .fallback(op("double_value")),
        )
        .on("double_value", |_, ctx| {
            let current = ctx
                .get("value")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| ModuleError::revert("value is not an integer"))?;
            let doubled = current
                .checked_mul(2)
                .ok_or_else(|| ModuleError::revert("overflow"))?;
            ctx.set("value", json!(doubled))?;
            Ok(json!(doubled))
        })
}

/// A module counting calls of the `increment` fallback in its storage.
#[must_use]
pub fn counter_module(id: &str) -> ScriptedModule {
    ScriptedModule::new(id)
        .with_manifest(ModuleManifest::new().fallback(op("increment")))
        .on("increment", |_, ctx| {
            let next = ctx
                .get("count")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0)
                .saturating_add(1);
            ctx.set("count", json!(next))?;
            Ok(json!(next))
        })
}
