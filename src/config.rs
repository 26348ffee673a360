//! Application-level configuration loading, including lobby lifetime tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORD_CLASH_BACK_CONFIG_PATH";
/// Environment variable that overrides the maintenance token from the file.
const MAINTENANCE_TOKEN_ENV: &str = "WORD_CLASH_BACK_MAINTENANCE_TOKEN";

/// How long a waiting lobby stays joinable.
const DEFAULT_LOBBY_TTL_SECS: u64 = 300;
/// Inactivity backstop for abandoned matches the expire sweep cannot reach.
const DEFAULT_INACTIVE_AFTER_SECS: u64 = 21_600;
/// Cadence of the background sweep task.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    lobby_ttl: Duration,
    inactive_after: Duration,
    sweep_interval: Duration,
    maintenance_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Ok(token) = env::var(MAINTENANCE_TOKEN_ENV) {
            if !token.is_empty() {
                config.maintenance_token = Some(token);
            }
        }

        config
    }

    /// How long a waiting lobby stays joinable before the expire sweep may
    /// reclaim it.
    pub fn lobby_ttl(&self) -> Duration {
        self.lobby_ttl
    }

    /// Inactivity threshold after which any match is reclaimed.
    pub fn inactive_after(&self) -> Duration {
        self.inactive_after
    }

    /// Cadence of the background sweep task.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Shared secret protecting the maintenance endpoints, if configured.
    pub fn maintenance_token(&self) -> Option<&str> {
        self.maintenance_token.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lobby_ttl: Duration::from_secs(DEFAULT_LOBBY_TTL_SECS),
            inactive_after: Duration::from_secs(DEFAULT_INACTIVE_AFTER_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            maintenance_token: None,
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
struct RawConfig {
    lobby_ttl_secs: Option<u64>,
    inactive_after_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    maintenance_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            lobby_ttl: raw
                .lobby_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.lobby_ttl),
            inactive_after: raw
                .inactive_after_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.inactive_after),
            sweep_interval: raw
                .sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            maintenance_token: raw.maintenance_token.filter(|token| !token.is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
