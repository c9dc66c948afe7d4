//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.modhost/config.toml` (user)
//! 3. Merge the explicit file, if any
//! 4. Apply env var fallbacks for unset fields
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Which layer set each leaf field.
    pub field_sources: FieldSources,
    /// Files that were merged, in merge order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// The layer that set a dotted field path, if known.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<ConfigLayer> {
        self.field_sources.get(field).copied()
    }
}

/// Load the configuration with layered precedence.
///
/// `explicit` is an additional file merged over the user layer.
/// `home_override` replaces the `~/.modhost` directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let user_dir = if let Some(h) = home_override {
        h.to_path_buf()
    } else {
        home_directory()?.join(".modhost")
    };
    load_layers(explicit, &user_dir, &collect_env_vars())
}

fn load_layers<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    user_dir: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    let user_path = user_dir.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        // An explicitly named file must exist.
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded explicit config");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, metadata.len())?;

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    check_size(path, content.len() as u64)?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn check_size(path: &Path, len: u64) -> ConfigResult<()> {
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_no_files() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_layers(None, home.path(), &no_env()).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.source_of("host.max_call_depth"),
            Some(ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_user_then_explicit_precedence() {
        let home = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[host]\nmax_call_depth = 8\ninstaller_permission = \"admin\"\n",
        )
        .unwrap();
        let explicit_dir = tempfile::tempdir().unwrap();
        let explicit = explicit_dir.path().join("host.toml");
        fs::write(&explicit, "[host]\nmax_call_depth = 4\n").unwrap();

        let resolved = load_layers(Some(&explicit), home.path(), &no_env()).unwrap();

        assert_eq!(resolved.config.host.max_call_depth, 4);
        assert_eq!(resolved.config.host.installer_permission, "admin");
        assert_eq!(resolved.config.events.capacity, 1024);
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.source_of("host.max_call_depth"),
            Some(ConfigLayer::Explicit)
        );
        assert_eq!(
            resolved.source_of("host.installer_permission"),
            Some(ConfigLayer::User)
        );
    }

    #[test]
    fn test_env_fallback_applies_after_files() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("config.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
        let env: HashMap<String, String> = [
            ("MODHOST_LOG_LEVEL".to_owned(), "trace".to_owned()),
            ("MODHOST_MAX_CALL_DEPTH".to_owned(), "12".to_owned()),
        ]
        .into_iter()
        .collect();

        let resolved = load_layers(None, home.path(), &env).unwrap();

        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.config.host.max_call_depth, 12);
        assert_eq!(
            resolved.source_of("host.max_call_depth"),
            Some(ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        let err = load_layers(Some(&missing), home.path(), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_malformed_user_file() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("config.toml"), "[host\nbroken").unwrap();
        let err = load_layers(None, home.path(), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_merged_value_fails_validation() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("config.toml"), "[events]\ncapacity = 0\n").unwrap();
        let err = load_layers(None, home.path(), &no_env()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "events.capacity"
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.toml");
        let padding = "#".repeat(usize::try_from(MAX_CONFIG_FILE_SIZE).unwrap().saturating_add(1));
        fs::write(&path, padding).unwrap();

        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_file_single() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.host.max_call_depth, 32);
    }
}
