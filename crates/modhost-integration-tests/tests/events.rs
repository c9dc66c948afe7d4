//! Integration tests for structural change events.

use std::sync::{Arc, Mutex};

use modhost_core::{Caller, ModuleManifest};
use modhost_events::{FilterSubscriber, HostEvent};
use modhost_kernel::HostSettings;
use modhost_test::{
    ScriptedModule, TEST_HOST_NAME, cap, module_id, test_host, value_module, value_module_v2,
};
use serde_json::json;

#[tokio::test]
async fn test_structural_changes_are_announced_in_order() {
    let mut host = test_host();
    let mut receiver = host.subscribe();

    let slot = host
        .install_module(&Caller::Host, value_module("store").into_module(), json!(null))
        .unwrap();
    host.update_module(
        &Caller::Host,
        &module_id("store"),
        value_module_v2("store-v2").into_module(),
    )
    .unwrap();
    host.uninstall_module(&Caller::Host, &module_id("store-v2"), json!(null))
        .unwrap();

    let installed = receiver.recv().await.unwrap();
    assert!(matches!(
        installed.as_ref(),
        HostEvent::ModuleInstalled { module, slot: s, .. }
            if *module == module_id("store") && *s == slot
    ));
    assert_eq!(installed.metadata().host_id, host.host_id());
    assert_eq!(installed.metadata().source, TEST_HOST_NAME);

    let updated = receiver.recv().await.unwrap();
    match updated.as_ref() {
        HostEvent::ModuleUpdated {
            previous,
            module,
            slot: s,
            ..
        } => {
            assert_eq!(*previous, module_id("store"));
            assert_eq!(*module, module_id("store-v2"));
            assert_eq!(*s, slot);
        },
        other => panic!("unexpected {other:?}"),
    }

    let uninstalled = receiver.recv().await.unwrap();
    assert_eq!(uninstalled.event_type(), "module_uninstalled");
    assert!(receiver.try_recv().is_none());
}

#[test]
fn test_failures_publish_nothing() {
    let mut host = test_host();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    host.events()
        .registry()
        .register(Arc::new(FilterSubscriber::new("audit", move |event: &HostEvent| {
            sink.lock().unwrap().push(event.event_type());
        })));

    let needy = ScriptedModule::new("needy")
        .with_manifest(ModuleManifest::new().requires(cap("missing")));
    assert!(
        host.install_module(&Caller::Host, needy.into_module(), json!(null))
            .is_err()
    );
    assert!(
        host.uninstall_module(&Caller::Host, &module_id("ghost"), json!(null))
            .is_err()
    );
    assert!(seen.lock().unwrap().is_empty());

    host.install_module(&Caller::Host, ScriptedModule::new("ok").into_module(), json!(null))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["module_installed"]);
}

#[test]
fn test_filtered_subscriber() {
    let mut host = test_host();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    host.events().registry().register(Arc::new(
        FilterSubscriber::new("uninstalls", move |event: &HostEvent| {
            sink.lock().unwrap().push(event.module().clone());
        })
        .with_filter(|event| matches!(event, HostEvent::ModuleUninstalled { .. })),
    ));

    host.install_module(&Caller::Host, ScriptedModule::new("fees").into_module(), json!(null))
        .unwrap();
    host.uninstall_module(&Caller::Host, &module_id("fees"), json!(null))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![module_id("fees")]);
}

#[test]
fn test_event_capacity_follows_settings() {
    let settings = HostSettings {
        event_capacity: 8,
        ..HostSettings::default()
    };
    let host = test_host().with_settings(settings);
    assert_eq!(host.events().capacity(), 8);
}
