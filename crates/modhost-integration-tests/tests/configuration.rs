//! Integration tests wiring configuration into the host and logging setup.

use modhost_config::{Config, ConfigError, ConfigLayer};
use modhost_core::{Caller, ModuleManifest, Permission};
use modhost_kernel::{HostError, HostSettings, ModuleHost};
use modhost_telemetry::{LogConfig, LogFormat};
use modhost_test::{
    ScriptedModule, installer_grants, op, principal, test_definition, test_dir, test_file,
};
use serde_json::json;

#[test]
fn test_layered_config_drives_host_settings() {
    let home = test_dir();
    std::fs::write(
        home.path().join("config.toml"),
        "[host]\nmax_call_depth = 8\ninstaller_permission = \"deployer\"\n",
    )
    .unwrap();
    let explicit = test_file("[host]\nmax_call_depth = 2\n\n[events]\ncapacity = 16\n");

    let resolved = Config::load_with_home(Some(explicit.path()), home.path()).unwrap();
    assert_eq!(resolved.config.host.max_call_depth, 2);
    assert_eq!(resolved.config.host.installer_permission, "deployer");
    assert_eq!(resolved.source_of("host.max_call_depth"), Some(ConfigLayer::Explicit));
    assert_eq!(resolved.source_of("host.installer_permission"), Some(ConfigLayer::User));
    assert_eq!(resolved.source_of("logging.level"), Some(ConfigLayer::Defaults));
    assert_eq!(resolved.loaded_files.len(), 2);

    let settings = HostSettings::try_from(&resolved.config).unwrap();
    assert_eq!(settings.installer_permission, Permission::from_static("deployer"));
    assert_eq!(settings.max_call_depth, 2);
    assert_eq!(settings.event_capacity, 16);

    let host = ModuleHost::new(&test_definition()).with_settings(settings);
    assert_eq!(host.events().capacity(), 16);
}

#[test]
fn test_configured_installer_permission_is_enforced() {
    let mut config = Config::default();
    config.host.installer_permission = "deployer".to_owned();
    let settings = HostSettings::try_from(&config).unwrap();

    // alice holds `installer`, which is no longer the configured permission.
    let mut host = ModuleHost::new(&test_definition())
        .with_settings(settings)
        .with_access_control(installer_grants("alice"));
    let err = host
        .install_module(
            &Caller::principal(principal("alice")),
            ScriptedModule::new("fees").into_module(),
            json!(null),
        )
        .unwrap_err();
    match err {
        HostError::Unauthorized { permission, .. } => assert_eq!(permission.as_str(), "deployer"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_configured_depth_limit_applies_to_dispatch() {
    let mut config = Config::default();
    config.host.max_call_depth = 1;
    let settings = HostSettings::try_from(&config).unwrap();
    let mut host = ModuleHost::new(&test_definition()).with_settings(settings);
    let module = ScriptedModule::new("nested")
        .with_manifest(
            ModuleManifest::new()
                .fallback(op("outer"))
                .fallback(op("inner")),
        )
        .on("outer", |_, ctx| Ok(ctx.dispatch(&op("inner"), json!(null))?));
    host.install_module(&Caller::Host, module.into_module(), json!(null))
        .unwrap();

    assert!(host.dispatch(&Caller::Host, &op("inner"), json!(null)).is_ok());
    let err = host
        .dispatch(&Caller::Host, &op("outer"), json!(null))
        .unwrap_err();
    assert!(matches!(err, HostError::CallDepthExceeded { limit: 1 }));
}

#[test]
fn test_invalid_config_is_rejected() {
    let home = test_dir();
    let explicit = test_file("[host]\nmax_call_depth = 0\n");
    let err = Config::load_with_home(Some(explicit.path()), home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));

    let missing = home.path().join("missing.toml");
    let err = Config::load_with_home(Some(&missing), home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn test_logging_section_maps_to_log_config() {
    let mut config = Config::default();
    config.logging.level = "debug".to_owned();
    config.logging.format = "json".to_owned();
    config.logging.directives = vec!["modhost_kernel=trace".to_owned()];

    let log_config = LogConfig::from(&config.logging);
    assert_eq!(log_config.level, "debug");
    assert_eq!(log_config.format, LogFormat::Json);
    assert!(log_config.build_filter().is_ok());

    let bad = LogConfig::new("info").with_directive("[invalid=syntax");
    assert!(bad.build_filter().is_err());
    assert!(modhost_telemetry::setup_logging(&bad).is_err());
}
