use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use nimbus_core::{NetworkError, ReqwestErrorExt};
use serde::{Deserialize, Serialize};

/// Timezone value that asks the forecast provider to infer the zone from coordinates.
pub const AUTO_TIMEZONE: &str = "auto";

/// Daily sections never hold more than a week.
pub const MAX_FORECAST_DAYS: usize = 7;

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

/// Visual theme a renderer picks for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Clear,
    Clouds,
    Rain,
    Snow,
    Thunder,
    Haze,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Clear => "clear",
            Theme::Clouds => "clouds",
            Theme::Rain => "rain",
            Theme::Snow => "snow",
            Theme::Thunder => "thunder",
            Theme::Haze => "haze",
        }
    }
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Cloudy, // Unknown codes render as neutral cloud cover
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Icon name; clear skies switch to a moon at night
    pub fn icon_name(&self, is_day: bool) -> &'static str {
        match self {
            Self::Clear if !is_day => "moon",
            Self::Clear => "sun",
            Self::PartlyCloudy if !is_day => "cloud_moon",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }

    pub fn theme(&self) -> Theme {
        match self {
            Self::Clear => Theme::Clear,
            Self::PartlyCloudy | Self::Cloudy => Theme::Clouds,
            Self::Fog => Theme::Haze,
            Self::Drizzle | Self::Rain | Self::HeavyRain | Self::Sleet => Theme::Rain,
            Self::Snow => Theme::Snow,
            Self::Thunderstorm => Theme::Thunder,
        }
    }
}

/// A validated latitude/longitude pair. Only [`Coordinates::new`] builds one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinatesRecord", into = "CoordinatesRecord")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CoordinatesRecord {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<CoordinatesRecord> for Coordinates {
    type Error = WeatherError;

    fn try_from(record: CoordinatesRecord) -> Result<Self, Self::Error> {
        Coordinates::new(record.latitude, record.longitude)
    }
}

impl From<Coordinates> for CoordinatesRecord {
    fn from(coords: Coordinates) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
        }
    }
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(WeatherError::InvalidPlace(format!(
                "latitude {latitude} out of range"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::InvalidPlace(format!(
                "longitude {longitude} out of range"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A resolved, named location. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlaceRecord", into = "PlaceRecord")]
pub struct Place {
    name: String,
    coordinates: Coordinates,
    timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlaceRecord {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timezone: String,
}

impl Place {
    /// Build a place; an empty timezone means "let the provider decide".
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let coordinates = Coordinates::new(latitude, longitude)?;
        let timezone = timezone.into();
        let timezone = if timezone.trim().is_empty() {
            AUTO_TIMEZONE.to_string()
        } else {
            timezone
        };
        Ok(Self {
            name: name.into(),
            coordinates,
            timezone,
        })
    }

    /// Placeholder used when a position has no resolvable name.
    pub fn unnamed(coordinates: Coordinates) -> Self {
        Self {
            name: format!(
                "Lat {:.2}, Lon {:.2}",
                coordinates.latitude, coordinates.longitude
            ),
            coordinates,
            timezone: AUTO_TIMEZONE.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates.longitude
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}

impl TryFrom<PlaceRecord> for Place {
    type Error = WeatherError;

    fn try_from(record: PlaceRecord) -> Result<Self, Self::Error> {
        Place::new(record.name, record.latitude, record.longitude, record.timezone)
    }
}

impl From<Place> for PlaceRecord {
    fn from(place: Place) -> Self {
        Self {
            name: place.name,
            latitude: place.coordinates.latitude,
            longitude: place.coordinates.longitude,
            timezone: place.timezone,
        }
    }
}

/// Instant readings from the `current` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i32>,
    #[serde(default)]
    pub is_day: Option<u8>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub uv_index: Option<f64>,
}

impl CurrentConditions {
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather_code.map(WeatherCondition::from_wmo_code)
    }

    /// Missing flag counts as daytime
    pub fn is_day(&self) -> bool {
        self.is_day != Some(0)
    }
}

/// Parallel hourly sequences indexed by `time`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
}

/// Parallel daily sequences indexed by `time`, one entry per calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub weather_code: Vec<Option<i32>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub sunrise: Vec<Option<String>>,
    #[serde(default)]
    pub sunset: Vec<Option<String>>,
    #[serde(default)]
    pub uv_index_max: Vec<Option<f64>>,
}

/// One forecast provider response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub current: CurrentConditions,
    #[serde(default)]
    pub hourly: HourlySeries,
    #[serde(default)]
    pub daily: DailySeries,
}

impl ForecastSnapshot {
    /// Check index alignment of every section and cap the daily section at a week.
    pub fn validate(mut self) -> Result<Self, WeatherError> {
        let hours = self.hourly.time.len();
        if self.hourly.temperature_2m.len() != hours
            || self.hourly.precipitation_probability.len() != hours
        {
            return Err(WeatherError::FetchFailed(
                "hourly series are not aligned".to_string(),
            ));
        }

        let days = self.daily.time.len();
        let daily = &mut self.daily;
        let lengths = [
            daily.weather_code.len(),
            daily.temperature_2m_max.len(),
            daily.temperature_2m_min.len(),
            daily.precipitation_probability_max.len(),
            daily.sunrise.len(),
            daily.sunset.len(),
            daily.uv_index_max.len(),
        ];
        if lengths.iter().any(|&len| len != days) {
            return Err(WeatherError::FetchFailed(
                "daily series are not aligned".to_string(),
            ));
        }

        if days > MAX_FORECAST_DAYS {
            daily.time.truncate(MAX_FORECAST_DAYS);
            daily.weather_code.truncate(MAX_FORECAST_DAYS);
            daily.temperature_2m_max.truncate(MAX_FORECAST_DAYS);
            daily.temperature_2m_min.truncate(MAX_FORECAST_DAYS);
            daily.precipitation_probability_max.truncate(MAX_FORECAST_DAYS);
            daily.sunrise.truncate(MAX_FORECAST_DAYS);
            daily.sunset.truncate(MAX_FORECAST_DAYS);
            daily.uv_index_max.truncate(MAX_FORECAST_DAYS);
        }

        Ok(self)
    }

    /// Wall-clock time at the forecast location
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + ChronoDuration::seconds(i64::from(self.utc_offset_seconds))
    }

    /// Current UV index, or today's maximum when the instant reading is missing
    pub fn uv_index(&self) -> Option<f64> {
        self.current
            .uv_index
            .or_else(|| self.daily.uv_index_max.first().copied().flatten())
    }
}

/// The single persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub place: Place,
    pub data: ForecastSnapshot,
    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh while strictly younger than `ttl`; an entry exactly `ttl` old is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let Ok(ttl) = ChronoDuration::from_std(ttl) else {
            return true;
        };
        now.signed_duration_since(self.captured_at) < ttl
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location request cancelled")]
    Cancelled,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Place not found")]
    NotFound,
    #[error("Please enter a city name")]
    EmptyQuery,
    #[error("Weather fetch failed: {0}")]
    FetchFailed(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Invalid place: {0}")]
    InvalidPlace(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        match err.into_network_error() {
            NetworkError::Timeout => WeatherError::Timeout,
            other => WeatherError::Network(other),
        }
    }
}

impl WeatherError {
    /// Short status-line text
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::NotFound => "Place not found",
            WeatherError::EmptyQuery => "Please enter a city name",
            WeatherError::FetchFailed(_) => "Weather fetch failed",
            WeatherError::Timeout => "The request timed out. Please try again.",
            WeatherError::Network(e) => e.user_message(),
            WeatherError::Parse(_) => "Received an unexpected response. Please try again.",
            WeatherError::Cache(_) => "Weather data may be outdated.",
            WeatherError::InvalidPlace(_) => "That location is not valid.",
        }
    }
}
