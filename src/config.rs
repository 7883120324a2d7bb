use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use kion_client::BrokerSettings;
use kion_client::config::{DEFAULT_APP_API_KEY_NAME, DEFAULT_SESSION_DURATION};

/// Directory override, mostly for tests and multi-profile setups.
pub const CONFIG_DIR_ENV: &str = "KION_CONFIG_DIR";

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Setting key (e.g. "host") to the variable that overrode it.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

/// Effective settings for one invocation.
///
/// Every field is optional at this level so layers can be merged; the
/// accessors apply defaults and report missing required values as
/// [`kion_client::Error::MissingConfiguration`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Humantime duration, e.g. `"168h"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_api_key_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_api_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate_app_api_keys: Option<bool>,
    /// Humantime duration, e.g. `"1h"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_access_role: Option<String>,
    /// Talk to this origin (e.g. `http://127.0.0.1:8080`) instead of
    /// `https://{host}`. Used for proxies and local testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_origin: Option<String>,
    #[serde(default, skip_serializing_if = "LoggingConfig::is_empty")]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl LoggingConfig {
    fn is_empty(&self) -> bool {
        self.level.is_none() && self.json.is_none()
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `$KION_CONFIG_DIR`, else `~/.config/kion`.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("kion"))
        .context("could not determine home directory")
}

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.json";
pub const CACHE_FILE_NAME: &str = "credential_cache.json";

pub fn user_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

// ---------------------------------------------------------------------------
// Loading and layering
// ---------------------------------------------------------------------------

impl Config {
    /// Load the layered configuration: the user config file, then
    /// `./kion.toml`, then `KION_*` environment variables. An explicit path
    /// replaces both files. Missing files are skipped; malformed ones fail.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let files = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                vec![path.to_path_buf()]
            }
            None => vec![user_config_path()?, PathBuf::from("kion.toml")],
        };

        let mut config = Self::default();
        for path in files {
            if let Some(layer) = Self::read_file(&path)? {
                tracing::debug!(path = %path.display(), "Loaded config file");
                config.merge(layer);
            }
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse one file; `None` if it does not exist.
    pub fn read_file(path: &Path) -> anyhow::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading config file {}", path.display()));
            }
        };
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Write the file-level settings as TOML, owner-only.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("writing {}", path.display()))?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }

    /// Overlay `other` on top of `self`: every value `other` sets wins.
    pub fn merge(&mut self, other: Config) {
        macro_rules! take {
            ($($field:ident).+) => {
                if other.$($field).+.is_some() {
                    self.$($field).+ = other.$($field).+;
                }
            };
        }
        take!(host);
        take!(idms);
        take!(username);
        take!(app_api_key_duration);
        take!(app_api_key_name);
        take!(rotate_app_api_keys);
        take!(session_duration);
        take!(region);
        take!(account_id);
        take!(cloud_access_role);
        take!(api_origin);
        take!(logging.level);
        take!(logging.json);
    }

    /// Apply `KION_*` environment variable overrides.
    ///
    /// Each applied variable is recorded in `env_overrides`. Values that do
    /// not parse are ignored.
    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = Some(matches!(
                        val.to_lowercase().as_str(),
                        "1" | "true" | "yes" | "on"
                    ));
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = Some(parsed);
                        ov.record($key, $env);
                    }
                }
            };
        }

        env_str!("host", "KION_HOST", self.host);
        env_parse!("idms", "KION_IDMS", self.idms);
        env_str!("username", "KION_USERNAME", self.username);
        env_str!(
            "app_api_key_duration",
            "KION_APP_API_KEY_DURATION",
            self.app_api_key_duration
        );
        env_str!("app_api_key_name", "KION_APP_API_KEY_NAME", self.app_api_key_name);
        env_bool!(
            "rotate_app_api_keys",
            "KION_ROTATE_APP_API_KEYS",
            self.rotate_app_api_keys
        );
        env_str!("session_duration", "KION_SESSION_DURATION", self.session_duration);
        env_str!("region", "KION_REGION", self.region);
        env_str!("account_id", "KION_ACCOUNT_ID", self.account_id);
        env_str!("cloud_access_role", "KION_CLOUD_ACCESS_ROLE", self.cloud_access_role);
        env_str!("api_origin", "KION_API_ORIGIN", self.api_origin);
        env_str!("logging.level", "KION_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "KION_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn host(&self) -> kion_client::Result<&str> {
        required(self.host.as_deref(), "host")
    }

    pub fn idms(&self) -> kion_client::Result<u32> {
        self.idms
            .ok_or_else(|| kion_client::Error::MissingConfiguration("idms".into()))
    }

    pub fn username(&self) -> kion_client::Result<&str> {
        required(self.username.as_deref(), "username")
    }

    pub fn account_id(&self) -> kion_client::Result<&str> {
        required(self.account_id.as_deref(), "account_id")
    }

    pub fn cloud_access_role(&self) -> kion_client::Result<&str> {
        required(self.cloud_access_role.as_deref(), "cloud_access_role")
    }

    pub fn region(&self) -> kion_client::Result<&str> {
        required(self.region.as_deref(), "region")
    }

    pub fn app_api_key_duration(&self) -> kion_client::Result<Duration> {
        let raw = required(self.app_api_key_duration.as_deref(), "app_api_key_duration")?;
        parse_duration("app_api_key_duration", raw)
    }

    pub fn session_duration(&self) -> kion_client::Result<Duration> {
        match self.session_duration.as_deref() {
            Some(raw) if !raw.is_empty() => parse_duration("session_duration", raw),
            _ => Ok(DEFAULT_SESSION_DURATION),
        }
    }

    pub fn app_api_key_name(&self) -> &str {
        self.app_api_key_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_APP_API_KEY_NAME)
    }

    pub fn rotate_app_api_keys(&self) -> bool {
        self.rotate_app_api_keys.unwrap_or(false)
    }

    pub fn api_origin(&self) -> Option<&str> {
        self.api_origin.as_deref().filter(|o| !o.is_empty())
    }

    pub fn log_level(&self) -> String {
        self.logging.level.clone().unwrap_or_else(default_log_level)
    }

    pub fn log_json(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }

    /// The subset of settings the credential broker needs.
    ///
    /// Only `host` is required up front; the broker asks for the rest when
    /// the chosen authentication path needs it. A present but malformed
    /// duration is an error here.
    pub fn broker_settings(&self) -> kion_client::Result<BrokerSettings> {
        let mut settings = BrokerSettings::new(self.host()?);
        settings.idms = self.idms;
        settings.username = self.username.clone().filter(|u| !u.is_empty());
        settings.app_api_key_duration = match self.app_api_key_duration.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse_duration("app_api_key_duration", raw)?),
            _ => None,
        };
        settings.rotate_app_api_keys = self.rotate_app_api_keys();
        settings.session_duration = self.session_duration()?;
        Ok(settings)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> kion_client::Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| kion_client::Error::MissingConfiguration(key.into()))
}

fn parse_duration(key: &str, raw: &str) -> kion_client::Result<Duration> {
    humantime::parse_duration(raw)
        .map_err(|e| kion_client::Error::Config(format!("invalid {key} '{raw}': {e}")))
}
