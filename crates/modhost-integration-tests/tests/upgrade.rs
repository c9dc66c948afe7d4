//! Integration tests for swapping implementations behind a slot.

mod common;

use common::HostSnapshot;
use modhost_core::{Caller, ModuleManifest};
use modhost_kernel::{HostError, slot_key};
use modhost_test::{
    ScriptedModule, cap, installer_grants, module_id, op, principal, test_host, value_module,
    value_module_v2,
};
use serde_json::json;

#[test]
fn test_state_survives_upgrade() {
    let mut host = test_host();
    let slot = host
        .install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();

    host.dispatch(&Caller::Host, &op("set_value"), json!(42))
        .unwrap();
    assert!(matches!(
        host.dispatch(&Caller::Host, &op("double_value"), json!(null)),
        Err(HostError::OperationNotInstalled { .. })
    ));

    let updated_slot = host
        .update_module(
            &Caller::Host,
            &module_id("store"),
            value_module_v2("store-v2").into_module(),
        )
        .unwrap();
    assert_eq!(updated_slot, slot);

    assert_eq!(
        host.dispatch(&Caller::Host, &op("get_value"), json!(null))
            .unwrap(),
        json!(42)
    );
    assert_eq!(
        host.dispatch(&Caller::Host, &op("double_value"), json!(null))
            .unwrap(),
        json!(84)
    );

    assert!(!host.is_installed(&module_id("store")));
    let installed = host.installed_module(&module_id("store-v2")).unwrap();
    assert_eq!(installed.slot, slot);
    assert_eq!(installed.manifest.fallbacks.len(), 3);
    assert_eq!(host.operation(&op("double_value")).unwrap().slot, slot);
    assert_eq!(host.capabilities().count(&cap("value.store")), 1);
}

#[test]
fn test_update_under_same_id() {
    let mut host = test_host();
    host.install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    host.dispatch(&Caller::Host, &op("set_value"), json!(5))
        .unwrap();

    host.update_module(
        &Caller::Host,
        &module_id("store"),
        value_module_v2("store").into_module(),
    )
    .unwrap();

    assert_eq!(
        host.dispatch(&Caller::Host, &op("double_value"), json!(null))
            .unwrap(),
        json!(10)
    );
}

#[test]
fn test_update_drops_operations_missing_from_new_manifest() {
    let mut host = test_host();
    host.install_module(&Caller::Host, value_module_v2("store").into_module(), json!(null))
        .unwrap();

    host.update_module(
        &Caller::Host,
        &module_id("store"),
        value_module("store").into_module(),
    )
    .unwrap();

    assert!(host.operation(&op("double_value")).is_none());
    assert!(host.operation(&op("get_value")).is_some());
}

#[test]
fn test_failed_update_leaves_host_untouched() {
    let mut host = test_host();
    host.install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    host.install_module(
        &Caller::Host,
        ScriptedModule::new("other")
            .with_manifest(ModuleManifest::new().fallback(op("double_value")))
            .into_module(),
        json!(null),
    )
    .unwrap();
    host.dispatch(&Caller::Host, &op("set_value"), json!(42))
        .unwrap();
    let before = HostSnapshot::of(&host);

    // `double_value` is already claimed by another module.
    let err = host
        .update_module(
            &Caller::Host,
            &module_id("store"),
            value_module_v2("store-v2").into_module(),
        )
        .unwrap_err();
    assert!(matches!(err, HostError::FallbackConflict { .. }));
    assert_eq!(HostSnapshot::of(&host), before);

    // The old implementation still serves the slot.
    assert_eq!(
        host.dispatch(&Caller::Host, &op("get_value"), json!(null))
            .unwrap(),
        json!(42)
    );
}

#[test]
fn test_update_checks_ids_and_permissions() {
    let mut host = test_host().with_access_control(installer_grants("alice"));
    host.install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    host.install_module(&Caller::Host, ScriptedModule::new("taken").into_module(), json!(null))
        .unwrap();

    let err = host
        .update_module(
            &Caller::Host,
            &module_id("ghost"),
            value_module_v2("ghost-v2").into_module(),
        )
        .unwrap_err();
    assert!(matches!(err, HostError::NotInstalled { .. }));

    let err = host
        .update_module(
            &Caller::Host,
            &module_id("store"),
            value_module_v2("taken").into_module(),
        )
        .unwrap_err();
    assert!(matches!(err, HostError::DuplicateModule { .. }));

    let err = host
        .update_module(
            &Caller::principal(principal("bob")),
            &module_id("store"),
            value_module_v2("store-v2").into_module(),
        )
        .unwrap_err();
    assert!(matches!(err, HostError::Unauthorized { .. }));

    host.update_module(
        &Caller::principal(principal("alice")),
        &module_id("store"),
        value_module_v2("store-v2").into_module(),
    )
    .unwrap();
}

#[test]
fn test_update_does_not_run_lifecycle_hooks() {
    let mut host = test_host();
    let v1 = ScriptedModule::new("hooked")
        .with_manifest(ModuleManifest::new().with_lifecycle_callback());
    let v2 = ScriptedModule::new("hooked-v2")
        .with_manifest(ModuleManifest::new().with_lifecycle_callback());
    let v1_handle = v1.clone();
    let v2_handle = v2.clone();

    host.install_module(&Caller::Host, v1.into_module(), json!(null))
        .unwrap();
    host.update_module(&Caller::Host, &module_id("hooked"), v2.into_module())
        .unwrap();

    assert_eq!(v1_handle.lifecycle().len(), 1);
    assert!(v2_handle.lifecycle().is_empty());
}

#[test]
fn test_slot_keys_are_stable_and_host_scoped() {
    let mut first = test_host();
    let mut second = test_host();
    let slot_a = first
        .install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    let slot_b = second
        .install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    assert_eq!(slot_a, slot_b);

    let key_before = first.slot_key(slot_a).unwrap();
    assert_eq!(key_before, slot_key(first.host_id(), slot_a));
    assert_ne!(key_before, second.slot_key(slot_b).unwrap());

    first
        .update_module(
            &Caller::Host,
            &module_id("store"),
            value_module_v2("store-v2").into_module(),
        )
        .unwrap();
    assert_eq!(first.slot_key(slot_a), Some(key_before));
}
