//! Configuration for the versioning context
//!
//! Loaded from, in increasing priority:
//! - Default values
//! - Config file (versioning.toml, .versioning.toml, config/versioning.toml)
//! - XDG config directory
//! - An explicit file
//! - Environment variables (VERSIONING__*)
//!
//! ## Example config file (versioning.toml):
//! ```toml
//! [logging]
//! filter = "familiar_versioning=debug"
//!
//! [schema]
//! validate_input = true
//! validate_output = true
//! json_schema_validation = true
//!
//! [migration]
//! fail_on_graph_issues = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::schema::EvolutionOptions;

/// Main configuration for a [`VersionContext`](crate::VersionContext)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Schema evolution settings applied to every family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_true")]
    pub validate_input: bool,

    #[serde(default = "default_true")]
    pub validate_output: bool,

    /// Attach the JSON Schema validator to new families
    #[serde(default = "default_true")]
    pub json_schema_validation: bool,
}

/// Migration registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Make `VersionContext::audit` fail on branch points and gaps
    #[serde(default)]
    pub fail_on_graph_issues: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
            json_schema_validation: true,
        }
    }
}

impl SchemaConfig {
    pub fn evolution_options(&self) -> EvolutionOptions {
        EvolutionOptions {
            validate_input: self.validate_input,
            validate_output: self.validate_output,
        }
    }
}

impl VersioningConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["versioning.toml", ".versioning.toml", "config/versioning.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "versioning") {
            let xdg_config = dirs.config_dir().join("versioning.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("VERSIONING")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VersioningConfig::default();
        assert_eq!(config.logging.filter, "info");
        assert!(config.schema.validate_input);
        assert!(config.schema.json_schema_validation);
        assert!(!config.migration.fail_on_graph_issues);
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = toml::to_string_pretty(&VersioningConfig::default()).unwrap();
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[schema]"));
        assert!(toml_str.contains("[migration]"));
    }

    #[test]
    fn test_load_explicit_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[schema]\nvalidate_output = false\n\n[migration]\nfail_on_graph_issues = true\n",
        )
        .unwrap();

        let config = VersioningConfig::load_from(Some(&path)).unwrap();
        assert!(config.schema.validate_input);
        assert!(!config.schema.validate_output);
        assert!(config.migration.fail_on_graph_issues);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versioning.toml");
        let mut config = VersioningConfig::default();
        config.logging.filter = "familiar_versioning=debug".to_string();
        config.schema.json_schema_validation = false;
        config.save(&path).unwrap();

        let loaded = VersioningConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.logging.filter, "familiar_versioning=debug");
        assert!(!loaded.schema.json_schema_validation);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VersioningConfig::load_from(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_evolution_options_follow_schema_section() {
        let schema = SchemaConfig {
            validate_input: false,
            validate_output: true,
            json_schema_validation: true,
        };
        let options = schema.evolution_options();
        assert!(!options.validate_input);
        assert!(options.validate_output);
    }
}
