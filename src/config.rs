//! Configuration for the parity pipeline.
//!
//! Settings come from a TOML file (`parity.toml` in the working directory unless
//! `--config` or `PARITY_CONFIG` names another one). Every field has a default, so a
//! missing file yields a usable configuration. Relative paths are resolved against the
//! directory of the config file they were read from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::extract::{ExtractLimits, ExtractionConfig};
use crate::models::ContentType;
use crate::parity::{DiffOptions, RuleConfig};
use crate::report::DEFAULT_PREVIEW_LIMIT;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "parity.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PARITY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot expand path {path:?}: {reason}")]
    Expand { path: String, reason: String },

    #[error("invalid production_base_url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub production_inventory: PathBuf,
    pub local_inventory: PathBuf,
    pub output_dir: PathBuf,
    /// Standalone rules file; replaces the `[rules]` section when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            production_inventory: PathBuf::from("inventory/production.json"),
            local_inventory: PathBuf::from("inventory/local.json"),
            output_dir: PathBuf::from("reports/parity"),
            rules_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Types that get a change note when local has no literal of them.
    pub watch_types: Vec<ContentType>,
    /// Rows per list in the Markdown summaries.
    pub preview_limit: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            watch_types: vec![ContentType::Blog, ContentType::News],
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub workers: usize,
    pub request_timeout_secs: u64,
    pub request_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub max_body_chars: usize,
    pub max_headings: usize,
    /// Ceiling on fetches per run (0 = unlimited); the rest wait for the next run.
    pub max_requests_per_run: usize,
    /// Origin used to resolve relative production URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_base_url: Option<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let limits = ExtractLimits::default();
        Self {
            workers: 3,
            request_timeout_secs: 15,
            request_delay_ms: 500,
            user_agent: None,
            max_body_chars: limits.max_body_chars,
            max_headings: limits.max_headings,
            max_requests_per_run: 0,
            production_base_url: None,
        }
    }
}

impl ExtractConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_body_chars: self.max_body_chars,
            max_headings: self.max_headings,
        }
    }

    pub fn pool(&self) -> ExtractionConfig {
        ExtractionConfig {
            workers: self.workers.max(1),
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }

    pub fn origin(&self) -> Result<Option<Url>, ConfigError> {
        self.production_base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| {
                Url::parse(u).map_err(|source| ConfigError::BaseUrl {
                    url: u.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

/// Effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub diff: DiffConfig,
    pub extract: ExtractConfig,
    pub rules: RuleConfig,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Settings {
    /// Parse TOML text. Paths are left as written.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            watch_types: self.diff.watch_types.clone(),
            generated_at: None,
        }
    }

    /// Expand `~` and environment variables in every path, then anchor relative
    /// paths at `base`.
    fn resolve_paths(&mut self, base: &Path) -> Result<(), ConfigError> {
        self.paths.production_inventory = resolve_path(&self.paths.production_inventory, base)?;
        self.paths.local_inventory = resolve_path(&self.paths.local_inventory, base)?;
        self.paths.output_dir = resolve_path(&self.paths.output_dir, base)?;
        if let Some(ref rules) = self.paths.rules_file {
            self.paths.rules_file = Some(resolve_path(rules, base)?);
        }
        Ok(())
    }
}

/// Expand `~`/`$VAR` and make the path absolute relative to `base`.
pub fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::Expand {
        path: raw.to_string(),
        reason: e.to_string(),
    })?;
    let expanded = PathBuf::from(expanded.as_ref());

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

/// Where to look for configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file; must exist.
    pub config_path: Option<PathBuf>,
    /// Directory used for relative paths when no config file is found.
    pub cwd: Option<PathBuf>,
}

/// Load settings: an explicit file must exist, the default file is optional.
pub fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let cwd = match options.cwd {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?,
    };

    let explicit = options
        .config_path
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let (path, required) = match explicit {
        Some(path) => (resolve_path(&path, &cwd)?, true),
        None => (cwd.join(DEFAULT_CONFIG_FILE), false),
    };

    let mut settings = match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("Loaded config from {}", path.display());
            let mut settings = Settings::from_toml(&text, &path)?;
            settings.source_path = Some(path.clone());
            settings
        }
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config at {}; using defaults", path.display());
            Settings::default()
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let base = settings
        .source_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(cwd);
    settings.resolve_paths(&base)?;

    Ok(settings)
}

/// Load a standalone rules file (`[rules]`-shaped TOML without the section header).
pub fn load_rules_file(path: &Path) -> Result<RuleConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&LoadOptions {
            config_path: None,
            cwd: Some(dir.path().to_path_buf()),
        })
        .unwrap();

        assert!(settings.source_path.is_none());
        assert_eq!(settings.extract.workers, 3);
        assert_eq!(settings.diff.preview_limit, 50);
        assert_eq!(
            settings.diff.watch_types,
            vec![ContentType::Blog, ContentType::News]
        );
        assert_eq!(settings.paths.output_dir, dir.path().join("reports/parity"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_settings(&LoadOptions {
            config_path: Some(dir.path().join("nope.toml")),
            cwd: Some(dir.path().to_path_buf()),
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_partial_file_and_relative_paths() {
        let dir = TempDir::new().unwrap();
        let conf_dir = dir.path().join("conf");
        std::fs::create_dir_all(&conf_dir).unwrap();
        let path = conf_dir.join("parity.toml");
        std::fs::write(
            &path,
            r#"
[paths]
output_dir = "out"

[extract]
workers = 8
production_base_url = "https://www.site.com"

[rules]
obsolete_patterns = ["^/eski-"]

[rules.semantic_redirects]
"/eski-kampanya" = "/kampanyalar"
"#,
        )
        .unwrap();

        let settings = load_settings(&LoadOptions {
            config_path: Some(path.clone()),
            cwd: Some(dir.path().to_path_buf()),
        })
        .unwrap();

        assert_eq!(settings.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(settings.paths.output_dir, conf_dir.join("out"));
        assert_eq!(
            settings.paths.production_inventory,
            conf_dir.join("inventory/production.json")
        );
        assert_eq!(settings.extract.workers, 8);
        assert_eq!(settings.extract.request_delay_ms, 500);
        assert_eq!(settings.rules.obsolete_patterns, vec!["^/eski-"]);
        assert_eq!(
            settings.extract.origin().unwrap().unwrap().as_str(),
            "https://www.site.com/"
        );
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Settings::from_toml("[extract]\nworkers = \"many\"", Path::new("p.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("p.toml"));
    }

    #[test]
    fn test_toml_round_trip_of_effective_settings() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        assert!(text.contains("[extract]"));
        let parsed = Settings::from_toml(&text, Path::new("x.toml")).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ExtractConfig {
            production_base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.origin(), Err(ConfigError::BaseUrl { .. })));
    }

    #[test]
    fn test_rules_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "important_pages = [\"/iletisim\"]\n").unwrap();
        let rules = load_rules_file(&path).unwrap();
        assert_eq!(rules.important_pages, vec!["/iletisim"]);
    }
}
