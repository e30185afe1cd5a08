//! Loader for `fixturekit.toml`.
//!
//! The file is optional. A missing file yields the defaults, a malformed one
//! logs a warning and yields the defaults too, so a broken local config never
//! stops a test run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fixturekit_core::session::{BuilderSession, SessionFactory};
use fixturekit_types::config::BuilderConfig;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "fixturekit.toml";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "FIXTUREKIT_CONFIG_DIR";

/// Load `{dir}/fixturekit.toml`.
pub fn load_builder_config(dir: &Path) -> BuilderConfig {
    let config_path = dir.join(CONFIG_FILE);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return BuilderConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return BuilderConfig::default();
        }
    };

    match toml::from_str::<BuilderConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            BuilderConfig::default()
        }
    }
}

/// Directory holding `fixturekit.toml`: `$FIXTUREKIT_CONFIG_DIR`, else the
/// current directory.
pub fn resolve_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load the configuration from [`resolve_config_dir`].
pub fn load_default_config() -> BuilderConfig {
    load_builder_config(&resolve_config_dir())
}

/// A session factory seeding every session from `config`.
pub fn session_factory_from_config(config: BuilderConfig) -> SessionFactory {
    Arc::new(move || BuilderSession::from_config(config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_builder_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_builder_config(tmp.path()), BuilderConfig::default());
    }

    #[test]
    fn load_builder_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
auto_commit = true
package_version = "2.0"
metadata_command = ["python", "setup.py", "egg_info"]
"#,
        )
        .unwrap();

        let config = load_builder_config(tmp.path());
        assert!(config.auto_commit);
        assert_eq!(config.package_version, "2.0");
        assert_eq!(
            config.metadata_command.as_deref(),
            Some(&["python".to_string(), "setup.py".to_string(), "egg_info".to_string()][..])
        );
    }

    #[test]
    fn load_builder_config_invalid_toml_returns_default() {
        fixturekit_observe::tracing_setup::init_test_tracing();
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "this is not { valid toml !!!").unwrap();
        assert_eq!(load_builder_config(tmp.path()), BuilderConfig::default());
    }

    #[test]
    fn session_factory_seeds_sessions() {
        let config = BuilderConfig {
            auto_commit: true,
            package_version: "3.1".to_string(),
            metadata_command: None,
        };
        let factory = session_factory_from_config(config);

        let session = factory();
        assert!(session.auto_commit());
        assert_eq!(session.package_version(), "3.1");

        session.set_auto_commit(false);
        session.reset();
        assert!(session.auto_commit());
    }
}
