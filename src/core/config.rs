use crate::providers::eodhd::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const API_TOKEN_ENV: &str = "API_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EodhdProviderConfig {
    pub base_url: String,
}

impl Default for EodhdProviderConfig {
    fn default() -> Self {
        EodhdProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub eodhd: EodhdProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen: String,
    /// Symbol looked up on every request, also the cache file name
    pub symbol: String,
    /// File name the badge is served under
    pub image_name: String,
    /// Price the previous close is compared against
    pub reference_point: f64,
    pub providers: ProvidersConfig,
    /// Directory holding `<symbol>.json`
    pub cache_dir: PathBuf,
    /// TrueType/OpenType font; the embedded Hack font is used without one
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen: "0.0.0.0:2468".to_string(),
            symbol: "SE0001192618".to_string(),
            image_name: "Handelsbanken_Multi_Asset_50.png".to_string(),
            reference_point: 237.0,
            providers: ProvidersConfig::default(),
            cache_dir: PathBuf::from("."),
            font_path: None,
        }
    }
}

impl AppConfig {
    /// Reads the default config file if there is one, otherwise uses defaults.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "quotebadge")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The API token from the environment; unset or empty means sample mode.
    pub fn api_token() -> Option<String> {
        token_from(std::env::var(API_TOKEN_ENV).ok())
    }

    /// Request path of the badge, always with a leading slash.
    pub fn image_route(&self) -> String {
        format!("/{}", self.image_name.trim_start_matches('/'))
    }
}

fn token_from(value: Option<String>) -> Option<String> {
    value.filter(|token| !token.is_empty())
}
