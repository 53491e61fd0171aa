use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// One finding from [`Config::validate`], keyed by its TOML path
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.field)
    }
}

/// Errors block startup; warnings are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(issue(field, message));
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(issue(field, message));
    }

    /// All errors on one line, for the `ConfigError::Invalid` payload
    pub fn error_summary(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }
}

fn issue(field: impl Into<String>, message: impl Into<String>) -> ConfigIssue {
    ConfigIssue {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (also holds the forecast cache)
    pub config_dir: PathBuf,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Whatever the provider reports (Celsius for Open-Meteo)
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

/// What happens to a device location request that loses the startup race
/// against the fallback timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    /// Cancel the pending device request; only the default location renders.
    #[default]
    CancelSuperseded,
    /// Let the device request finish and render over the default location.
    LastResultWins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub geocoding_url: String,
    pub reverse_geocoding_url: String,
    pub forecast_url: String,
    pub ip_geolocation_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            reverse_geocoding_url: "https://geocoding-api.open-meteo.com/v1/reverse".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            ip_geolocation_url: "https://ipapi.co/json/".to_string(),
        }
    }
}

/// All time budgets, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Geocoding and reverse geocoding requests
    pub geocode_ms: u64,
    /// Forecast requests
    pub forecast_ms: u64,
    /// IP geolocation requests
    pub ip_ms: u64,
    /// Device geolocation request
    pub device_ms: u64,
    /// Maximum age of a position the device may answer from its own cache
    pub device_max_age_ms: u64,
    /// Startup fallback timer racing the device request
    pub fallback_timer_ms: u64,
    /// Delay before the loading indicator appears
    pub loading_delay_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            geocode_ms: 7000,
            forecast_ms: 7000,
            ip_ms: 4000,
            device_ms: 5000,
            device_max_age_ms: 600_000,
            fallback_timer_ms: 1500,
            loading_delay_ms: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn geocode(&self) -> Duration {
        Duration::from_millis(self.geocode_ms)
    }

    pub fn forecast(&self) -> Duration {
        Duration::from_millis(self.forecast_ms)
    }

    pub fn ip(&self) -> Duration {
        Duration::from_millis(self.ip_ms)
    }

    pub fn device(&self) -> Duration {
        Duration::from_millis(self.device_ms)
    }

    pub fn device_max_age(&self) -> Duration {
        Duration::from_millis(self.device_max_age_ms)
    }

    pub fn fallback_timer(&self) -> Duration {
        Duration::from_millis(self.fallback_timer_ms)
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Temperature unit preference
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Location shown when nothing else can be resolved
    #[serde(default = "default_location")]
    pub default_location: String,

    /// Region appended to two-part queries ("City, State" -> "City, State, India")
    #[serde(default = "default_regional_qualifier")]
    pub regional_qualifier: String,

    /// How long a cached forecast is shown without blocking, in minutes
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u32,

    #[serde(default)]
    pub race_policy: RacePolicy,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_location() -> String {
    "Chandigarh, India".to_string()
}

fn default_regional_qualifier() -> String {
    "India".to_string()
}

fn default_cache_ttl_minutes() -> u32 {
    30
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Auto,
            default_location: default_location(),
            regional_qualifier: default_regional_qualifier(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            race_policy: RacePolicy::default(),
            endpoints: EndpointConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl WeatherConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_ttl_minutes) * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nimbus");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the user config directory, writing defaults on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Writing default config");
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load (from `path` or the default location) and reject configs with errors.
    /// Warnings are logged and handed back to the caller.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };

        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        for warning in &validation.warnings {
            tracing::warn!(field = %warning.field, "Config warning: {}", warning.message);
        }
        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let weather = &self.weather;

        let endpoints = [
            (&weather.endpoints.geocoding_url, "weather.endpoints.geocoding_url"),
            (
                &weather.endpoints.reverse_geocoding_url,
                "weather.endpoints.reverse_geocoding_url",
            ),
            (&weather.endpoints.forecast_url, "weather.endpoints.forecast_url"),
            (
                &weather.endpoints.ip_geolocation_url,
                "weather.endpoints.ip_geolocation_url",
            ),
        ];
        for (url, field) in endpoints {
            Self::check_endpoint(url, field, &mut result);
        }

        if weather.default_location.trim().is_empty() {
            result.add_error(
                "weather.default_location",
                "Default location must not be empty",
            );
        }

        if weather.regional_qualifier.trim().is_empty() {
            result.add_warning(
                "weather.regional_qualifier",
                "No regional qualifier; two-part queries get a trailing comma",
            );
        }

        if weather.cache_ttl_minutes == 0 {
            result.add_warning(
                "weather.cache_ttl_minutes",
                "Cached forecasts will never be shown (0 minutes)",
            );
        } else if weather.cache_ttl_minutes > 1440 {
            result.add_warning(
                "weather.cache_ttl_minutes",
                "Cached forecasts may be more than 24 hours old",
            );
        }

        let timeouts = &weather.timeouts;
        let budgets = [
            (timeouts.geocode_ms, "weather.timeouts.geocode_ms"),
            (timeouts.forecast_ms, "weather.timeouts.forecast_ms"),
            (timeouts.ip_ms, "weather.timeouts.ip_ms"),
            (timeouts.device_ms, "weather.timeouts.device_ms"),
        ];
        for (value, field) in budgets {
            if value == 0 {
                result.add_error(field, "Timeout must be greater than 0");
            }
        }

        if timeouts.fallback_timer_ms >= timeouts.device_ms {
            result.add_warning(
                "weather.timeouts.fallback_timer_ms",
                "Fallback timer never fires before the device timeout",
            );
        }

        result
    }

    /// Endpoints must be absolute http(s) URLs with a host
    fn check_endpoint(raw: &str, field: &str, result: &mut ValidationResult) {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                result.add_error(field, format!("Invalid URL: {e}"));
                return;
            }
        };
        if !matches!(url.scheme(), "http" | "https") {
            result.add_error(
                field,
                format!("URL must use http or https scheme, got: {}", url.scheme()),
            );
        }
        if url.host_str().map_or(true, str::is_empty) {
            result.add_error(field, "URL must have a host");
        }
    }

    /// Write to `config.toml` in the user config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Directory holding the persisted forecast cache
    pub fn cache_dir(&self) -> PathBuf {
        self.config_dir.join("cache")
    }

    fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No user config directory on this platform")?;
        Ok(base.join("nimbus").join("config.toml"))
    }
}
