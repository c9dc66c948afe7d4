//! End-to-end scenarios across install, dispatch, callbacks and uninstall.

use modhost_core::{CallbackCatalog, Caller, ModuleManifest};
use modhost_kernel::{CallbackOutcome, HostError};
use modhost_test::{ScriptedModule, cap, module_id, op, principal, test_host_with_catalog};
use serde_json::json;

#[test]
fn test_install_dispatch_uninstall_lifecycle() {
    let mut host = test_host_with_catalog(
        CallbackCatalog::new()
            .required(op("op_a"))
            .optional(op("op_b")),
    );
    let module = ScriptedModule::new("x")
        .with_manifest(
            ModuleManifest::new()
                .callback(op("op_a"))
                .fallback(op("op_c")),
        )
        .on("op_a", |_, _| Ok(json!("a handled")))
        .on("op_c", |args, _| Ok(json!({"c": args})));
    host.install_module(&Caller::Host, module.into_module(), json!(null))
        .unwrap();

    // Fallbacks without a permission are open to any caller.
    for caller in [
        Caller::Host,
        Caller::principal(principal("alice")),
        Caller::principal(principal("bob")),
    ] {
        assert_eq!(
            host.dispatch(&caller, &op("op_c"), json!(1)).unwrap(),
            json!({"c": 1})
        );
    }
    assert_eq!(
        host.execute_callback(&op("op_a"), json!(null)).unwrap(),
        CallbackOutcome::Executed(json!("a handled"))
    );
    assert!(host.execute_callback(&op("op_b"), json!(null)).unwrap().is_skipped());

    host.uninstall_module(&Caller::Host, &module_id("x"), json!(null))
        .unwrap();

    let err = host.execute_callback(&op("op_a"), json!(null)).unwrap_err();
    assert!(matches!(err, HostError::CallbackRequired { .. }));
    let err = host
        .dispatch(&Caller::Host, &op("op_c"), json!(1))
        .unwrap_err();
    assert!(matches!(err, HostError::OperationNotInstalled { .. }));
    assert!(host.installed_modules().is_empty());
}

#[test]
fn test_capability_chain_across_modules() {
    let mut host = test_host_with_catalog(CallbackCatalog::new().optional(op("before_mint")));

    let base = ScriptedModule::new("token-core")
        .with_manifest(ModuleManifest::new().provides(cap("token.core")));
    let extension = ScriptedModule::new("allowlist")
        .with_manifest(
            ModuleManifest::new()
                .requires(cap("token.core"))
                .callback(op("before_mint")),
        )
        .reverting("before_mint", "not allowed");

    let err = host
        .install_module(&Caller::Host, extension.clone().into_module(), json!(null))
        .unwrap_err();
    assert!(matches!(err, HostError::CapabilityMismatch { .. }));

    host.install_module(&Caller::Host, base.into_module(), json!(null))
        .unwrap();
    host.install_module(&Caller::Host, extension.into_module(), json!(null))
        .unwrap();

    let err = host
        .execute_callback(&op("before_mint"), json!({"to": "mallory"}))
        .unwrap_err();
    assert!(matches!(err, HostError::ModuleFailed { .. }));

    let ids: Vec<&str> = host
        .installed_modules()
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(ids, vec!["allowlist", "token-core"]);
}
