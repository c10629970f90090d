//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/arborist/arborist.toml`
//! 3. Local config: `<data_dir>/.arborist.toml`
//! 4. Environment variables: `ARBORIST__*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Flattened listing defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size used when a query leaves it unset
    pub page_size: usize,
    /// Whether keyword filtering distinguishes case
    pub case_sensitive: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            case_sensitive: true,
        }
    }
}

/// What happens to referencing resources when their node is deleted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    #[default]
    Purge,
    Reassign,
}

impl std::str::FromStr for CascadeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "purge" => Ok(Self::Purge),
            "reassign" => Ok(Self::Reassign),
            other => Err(format!("unknown cascade policy '{other}' (purge|reassign)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CascadeConfig {
    pub policy: CascadeMode,
    /// Node id receiving orphaned resources under `reassign`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassign_to: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawListingConfig {
    pub page_size: Option<usize>,
    pub case_sensitive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCascadeConfig {
    pub policy: Option<CascadeMode>,
    pub reassign_to: Option<u64>,
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified here, inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub listing: RawListingConfig,
    pub cascade: RawCascadeConfig,
}

/// Unified configuration for arborist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding forest snapshots (default: ~/.arborist)
    pub data_dir: PathBuf,
    pub listing: ListingConfig,
    pub cascade: CascadeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: dirs_default_data_dir(),
            listing: ListingConfig::default(),
            cascade: CascadeConfig::default(),
        }
    }
}

/// Get the default data directory (~/.arborist).
fn dirs_default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".arborist"))
        .unwrap_or_else(|| PathBuf::from("~/.arborist"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Get the XDG config directory for arborist.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "arborist").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("arborist.toml"))
}

/// Get the path to the local config file in a data directory.
pub fn local_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".arborist.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            listing: ListingConfig {
                page_size: overlay.listing.page_size.unwrap_or(self.listing.page_size),
                case_sensitive: overlay
                    .listing
                    .case_sensitive
                    .unwrap_or(self.listing.case_sensitive),
            },
            cascade: CascadeConfig {
                policy: overlay.cascade.policy.unwrap_or(self.cascade.policy),
                reassign_to: overlay.cascade.reassign_to.or(self.cascade.reassign_to),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `data_dir` - Explicit data directory (e.g. from `--data-dir`). When
    ///   given it also locates the local config file and wins over any
    ///   `data_dir` the config layers set.
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config in the data directory
        let local_dir = data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| current.data_dir.clone());
        let local_path = local_config_path(Path::new(&expand_env_vars(
            local_dir.to_string_lossy().as_ref(),
        )));
        if local_path.exists() {
            let raw = load_raw_settings(&local_path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        if let Some(dir) = data_dir {
            current.data_dir = dir.to_path_buf();
        }
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply ARBORIST__* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ARBORIST")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_int("listing.page_size") {
            settings.listing.page_size = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("listing.page_size must not be negative: {val}"),
            })?;
        }
        if let Ok(val) = config.get_bool("listing.case_sensitive") {
            settings.listing.case_sensitive = val;
        }
        if let Ok(val) = config.get_string("cascade.policy") {
            settings.cascade.policy = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_int("cascade.reassign_to") {
            settings.cascade.reassign_to =
                Some(u64::try_from(val).map_err(|_| ApplicationError::Config {
                    message: format!("cascade.reassign_to must be a node id: {val}"),
                })?);
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.listing.page_size == 0 {
            return Err(ApplicationError::Config {
                message: "listing.page_size must be at least 1".into(),
            });
        }
        if self.cascade.policy == CascadeMode::Reassign && self.cascade.reassign_to.is_none() {
            return Err(ApplicationError::Config {
                message: "cascade.policy = \"reassign\" requires cascade.reassign_to".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# arborist configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/arborist/arborist.toml
#   Local:  <data_dir>/.arborist.toml
#   Env:    ARBORIST__* environment variables (e.g. ARBORIST__LISTING__PAGE_SIZE=20)

# Directory holding forest snapshots
# data_dir = "~/.arborist"

[listing]
# page_size = 10
# case_sensitive = true

[cascade]
# What happens to resources pointing at deleted nodes: "purge" or "reassign"
# policy = "purge"
# reassign_to = 1
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_default_settings_when_created_then_listing_defaults_apply() {
        let settings = Settings::default();
        assert_eq!(settings.listing.page_size, 10);
        assert!(settings.listing.case_sensitive);
        assert_eq!(settings.cascade.policy, CascadeMode::Purge);
        assert!(settings.data_dir.to_string_lossy().contains(".arborist"));
    }

    #[test]
    fn given_tilde_in_data_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            data_dir: PathBuf::from("~/.arborist"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.data_dir.to_string_lossy();
        assert!(dir.starts_with(&home), "data_dir should start with home: {dir}");
        assert!(!dir.contains('~'));
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_fields_are_kept() {
        let base = Settings::default();
        let overlay = RawSettings {
            data_dir: None,
            listing: RawListingConfig {
                page_size: Some(25),
                case_sensitive: None,
            },
            cascade: RawCascadeConfig {
                policy: Some(CascadeMode::Reassign),
                reassign_to: Some(7),
            },
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.data_dir, base.data_dir);
        assert_eq!(result.listing.page_size, 25);
        assert!(result.listing.case_sensitive);
        assert_eq!(result.cascade.policy, CascadeMode::Reassign);
        assert_eq!(result.cascade.reassign_to, Some(7));
    }

    #[test]
    fn given_local_config_when_loading_then_local_values_apply() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            local_config_path(dir.path()),
            "[listing]\npage_size = 3\ncase_sensitive = false\n",
        )
        .expect("write config");

        let settings = Settings::load(Some(dir.path())).expect("load");

        assert_eq!(settings.data_dir, dir.path());
        assert_eq!(settings.listing.page_size, 3);
        assert!(!settings.listing.case_sensitive);
    }

    #[test]
    fn given_reassign_without_target_when_loading_then_config_error() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            local_config_path(dir.path()),
            "[cascade]\npolicy = \"reassign\"\n",
        )
        .expect("write config");

        let result = Settings::load(Some(dir.path()));

        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_settings_when_to_toml_then_contains_sections() {
        let toml = Settings::default().to_toml().expect("serialize");
        assert!(toml.contains("[listing]"));
        assert!(toml.contains("page_size = 10"));
        assert!(toml.contains("[cascade]"));
    }

    #[test]
    fn given_policy_strings_when_parsing_then_case_insensitive() {
        assert_eq!("Purge".parse::<CascadeMode>(), Ok(CascadeMode::Purge));
        assert_eq!("REASSIGN".parse::<CascadeMode>(), Ok(CascadeMode::Reassign));
        assert!("drop".parse::<CascadeMode>().is_err());
    }
}
