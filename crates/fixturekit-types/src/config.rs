//! Builder configuration types.
//!
//! `BuilderConfig` represents the optional `fixturekit.toml` that seeds every
//! builder session: whether creations are committed immediately, the default
//! version of generated packages, and how distribution metadata is produced.

use serde::{Deserialize, Serialize};

/// Top-level configuration for fixture sessions.
///
/// All fields have defaults, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Commit the platform transaction after every `create()`.
    #[serde(default)]
    pub auto_commit: bool,

    /// Version written into generated `setup.py` files.
    #[serde(default = "default_package_version")]
    pub package_version: String,

    /// Command used to build distribution metadata, run in the package root.
    ///
    /// When absent, the `.egg-info` directory is written natively.
    #[serde(default)]
    pub metadata_command: Option<Vec<String>>,
}

fn default_package_version() -> String {
    "1.0.0.dev0".to_string()
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            auto_commit: false,
            package_version: default_package_version(),
            metadata_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config_default_values() {
        let config = BuilderConfig::default();
        assert!(!config.auto_commit);
        assert_eq!(config.package_version, "1.0.0.dev0");
        assert!(config.metadata_command.is_none());
    }

    #[test]
    fn test_builder_config_deserialize_with_defaults() {
        let config: BuilderConfig = toml::from_str("").unwrap();
        assert_eq!(config, BuilderConfig::default());
    }

    #[test]
    fn test_builder_config_deserialize_with_values() {
        let toml_str = r#"
auto_commit = true
package_version = "2.0.0"
metadata_command = ["python", "setup.py", "egg_info"]
"#;
        let config: BuilderConfig = toml::from_str(toml_str).unwrap();
        assert!(config.auto_commit);
        assert_eq!(config.package_version, "2.0.0");
        assert_eq!(
            config.metadata_command.as_deref(),
            Some(&["python".to_string(), "setup.py".to_string(), "egg_info".to_string()][..])
        );
    }
}
