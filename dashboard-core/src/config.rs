use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinate;

/// Shown when geolocation is denied or unavailable and no home is set.
pub const DEFAULT_FALLBACK: Coordinate = Coordinate::new(51.5074, -0.1278);

/// Credentials for the OpenWeather API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub api_key: String,
}

/// Base URLs of the external services. Overridable so tests and self-hosted
/// deployments can point elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub openweather: String,
    pub sun_times: String,
    pub prediction: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "https://nominatim.openstreetmap.org".to_string(),
            openweather: "https://api.openweathermap.org".to_string(),
            sun_times: "https://api.sunrise-sunset.org".to_string(),
            prediction: "http://localhost:8000".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// allow_geolocation = true
/// identity = "ada"
///
/// [home]
/// latitude = 59.91
/// longitude = 10.75
///
/// [openweather]
/// api_key = "..."
///
/// [endpoints]
/// prediction = "http://localhost:8000"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// When false the geolocator reports permission denied.
    pub allow_geolocation: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Display name of the signed-in user, if any.
    pub identity: Option<String>,
    pub fallback: Coordinate,
    /// Coordinate reported by the geolocator.
    pub home: Option<Coordinate>,
    pub openweather: Option<ApiKeyConfig>,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_geolocation: true,
            request_timeout_secs: 10,
            user_agent: concat!("weather-dash/", env!("CARGO_PKG_VERSION")).to_string(),
            identity: None,
            fallback: DEFAULT_FALLBACK,
            home: None,
            openweather: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dash", "weather-dash")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_openweather_api_key(&mut self, api_key: String) {
        self.openweather = Some(ApiKeyConfig { api_key });
    }

    pub fn openweather_api_key(&self) -> Option<&str> {
        self.openweather
            .as_ref()
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_openweather_configured(&self) -> bool {
        self.openweather_api_key().is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
