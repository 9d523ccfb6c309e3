//! Optional project configuration.
//!
//! Looked up as `xctranslate.toml`, `xctranslate.yaml` or `xctranslate.yml`
//! in the working directory unless `--config` names a file. Command-line
//! flags win over file values; `DEEPL_AUTH_KEY` and `MYMEMORY_EMAIL` win over
//! the secrets stored in the file.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;
use xctranslate::{
    ClassifierConfig, Error, ProviderKind, ProviderSettings, language::APP_STORE_LANGUAGES,
};

pub const DEFAULT_CONFIG_FILES: [&str; 3] =
    ["xctranslate.toml", "xctranslate.yaml", "xctranslate.yml"];

/// Catalog used when neither `--catalog` nor the config file names one.
pub const DEFAULT_CATALOG: &str = "Localizable.xcstrings";

pub const DEEPL_AUTH_KEY_VAR: &str = "DEEPL_AUTH_KEY";
pub const MYMEMORY_EMAIL_VAR: &str = "MYMEMORY_EMAIL";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Catalog used when `--catalog` is not given.
    pub catalog: Option<PathBuf>,
    pub source_language: Option<String>,
    /// Target languages considered by `status` and by `translate` without
    /// `--lang`, on top of those the catalog already has. Defaults to the
    /// App Store set; an empty list means catalog languages only.
    pub languages: Option<Vec<String>>,
    pub checkpoint_every: Option<usize>,
    pub workers: Option<usize>,
    pub max_translations: Option<usize>,
    pub provider: ProviderConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub name: Option<ProviderKind>,
    /// Replaces the backend's public URL.
    pub endpoint: Option<String>,
    pub email: Option<String>,
    pub auth_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub min_interval_ms: Option<u64>,
    pub throttle_cooldown_secs: Option<u64>,
}

impl Config {
    /// Loads `explicit`, or the first default file found in the working
    /// directory, then applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::config_error(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::discover(Path::new(".")),
        };

        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)?
            }
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// First default config file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let parsed = match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => {
                return Err(Error::config_error(format!(
                    "unsupported config format: {}. Expected .toml, .yaml or .yml",
                    path.display()
                )));
            }
        };
        parsed.map_err(|e| match e {
            Error::Config(message) => {
                Error::config_error(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::config_error(e.to_string()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, Error> {
        // An empty YAML document is a valid, empty configuration.
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::config_error(e.to_string()))
    }

    /// Overrides secrets with non-empty values from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = non_empty(DEEPL_AUTH_KEY_VAR) {
            self.provider.auth_key = Some(key);
        }
        if let Some(email) = non_empty(MYMEMORY_EMAIL_VAR) {
            self.provider.email = Some(email);
        }
    }

    /// `--catalog` if given, then the configured catalog, then
    /// [`DEFAULT_CATALOG`].
    pub fn catalog_path(&self, flag: Option<&str>) -> PathBuf {
        flag.map(PathBuf::from)
            .or_else(|| self.catalog.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG))
    }

    /// Configured target languages, or the App Store set.
    pub fn target_languages(&self) -> Vec<String> {
        match &self.languages {
            Some(languages) => languages.clone(),
            None => APP_STORE_LANGUAGES.iter().map(|code| code.to_string()).collect(),
        }
    }

    /// Backend settings for `kind`, or for the configured provider when
    /// `kind` is `None`.
    pub fn provider_settings(&self, kind: Option<ProviderKind>) -> ProviderSettings {
        let provider = &self.provider;
        let mut settings = ProviderSettings::new(kind.or(provider.name).unwrap_or_default());
        settings.endpoint = provider.endpoint.clone();
        settings.email = provider.email.clone();
        settings.api_key = provider.auth_key.clone();
        if let Some(secs) = provider.timeout_secs {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = provider.max_attempts {
            settings.retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = provider.min_interval_ms {
            settings.retry.min_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = provider.throttle_cooldown_secs {
            settings.retry.throttle_cooldown = Duration::from_secs(secs);
        }
        settings
    }
}
