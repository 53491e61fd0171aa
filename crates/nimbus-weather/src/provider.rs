//! Forecast fetcher for the Open-Meteo forecast API.

use std::time::Duration;

use nimbus_core::WeatherConfig;
use tracing::instrument;

use crate::http::{build_url, TimedClient};
use crate::types::{ForecastSnapshot, WeatherError, AUTO_TIMEZONE};

const CURRENT_FIELDS: &str = "temperature_2m,weather_code,is_day,wind_speed_10m,relative_humidity_2m,apparent_temperature,uv_index";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,sunrise,sunset,uv_index_max";
const FORECAST_HOURS: &str = "48";
const FORECAST_DAYS: &str = "7";

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    http: TimedClient,
    forecast_url: String,
    timeout: Duration,
}

impl WeatherProvider {
    pub fn new(http: TimedClient, config: &WeatherConfig) -> Self {
        Self {
            http,
            forecast_url: config.endpoints.forecast_url.clone(),
            timeout: config.timeouts.forecast(),
        }
    }

    /// Fetch current, hourly (48 h) and daily (7 d) data for a position.
    ///
    /// Timeouts surface as [`WeatherError::Timeout`]; every other failure,
    /// including a misaligned payload, as [`WeatherError::FetchFailed`].
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<ForecastSnapshot, WeatherError> {
        let timezone = if timezone.trim().is_empty() {
            AUTO_TIMEZONE
        } else {
            timezone
        };
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let url = build_url(
            &self.forecast_url,
            [
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("timezone", timezone),
                ("current", CURRENT_FIELDS),
                ("hourly", HOURLY_FIELDS),
                ("forecast_hours", FORECAST_HOURS),
                ("daily", DAILY_FIELDS),
                ("forecast_days", FORECAST_DAYS),
            ],
        )?;

        let snapshot = match self.http.get_json::<ForecastSnapshot>(url, self.timeout).await {
            Ok(snapshot) => snapshot,
            Err(WeatherError::Timeout) => {
                tracing::warn!("Forecast request timed out");
                return Err(WeatherError::Timeout);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Forecast request failed");
                return Err(WeatherError::FetchFailed(e.to_string()));
            }
        };

        snapshot.validate()
    }
}
