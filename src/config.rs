//! Engine configuration
//!
//! Later layers override earlier ones:
//! - built-in defaults
//! - `eo-naming.toml`, `.eo-naming.toml`, `config/eo-naming.toml`
//! - `eo-naming.toml` in the user config directory
//! - an explicitly named file
//! - `EO_NAMING__*` environment variables
//!
//! ## eo-naming.toml
//! ```toml
//! [registry]
//! schema_root = "./schemas"
//! file_marker = "filename_v"
//! preview_limit = 8
//! ```
//!
//! Without a `schema_root` the schemas bundled into the binary are used.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::registry::{DEFAULT_FILE_MARKER, DEFAULT_PREVIEW_LIMIT};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory scanned for schema documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_root: Option<PathBuf>,

    /// Substring a schema file name must contain
    #[serde(default = "default_file_marker")]
    pub file_marker: String,

    /// Number of schema paths listed when nothing matches
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

fn default_file_marker() -> String {
    DEFAULT_FILE_MARKER.to_string()
}

fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            schema_root: None,
            file_marker: default_file_marker(),
            preview_limit: default_preview_limit(),
        }
    }
}

impl NamingConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["eo-naming.toml", ".eo-naming.toml", "config/eo-naming.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("org", "eo-naming", "eo-naming") {
            let xdg_config = dirs.config_dir().join("eo-naming.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // EO_NAMING__REGISTRY__SCHEMA_ROOT=/data/schemas
        builder = builder.add_source(
            Environment::with_prefix("EO_NAMING")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.normalize();
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    fn normalize(&mut self) {
        if self.registry.file_marker.is_empty() {
            self.registry.file_marker = default_file_marker();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = NamingConfig::default();
        assert!(config.registry.schema_root.is_none());
        assert_eq!(config.registry.file_marker, "filename_v");
        assert_eq!(config.registry.preview_limit, 8);
    }

    #[test]
    fn test_serialize_config() {
        let config = NamingConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("preview_limit = 8"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\nschema_root = \"/srv/schemas\"\npreview_limit = 3\n",
        )
        .unwrap();

        let config = NamingConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.registry.schema_root, Some(PathBuf::from("/srv/schemas")));
        assert_eq!(config.registry.preview_limit, 3);
        assert_eq!(config.registry.file_marker, "filename_v");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = NamingConfig::default();
        config.registry.schema_root = Some(PathBuf::from("schemas"));
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = NamingConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.registry.schema_root, Some(PathBuf::from("schemas")));
    }
}
