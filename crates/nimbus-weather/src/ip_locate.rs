//! IP-based geolocation, the fallback when the device can't say where it is.

use std::time::Duration;

use async_trait::async_trait;
use nimbus_core::WeatherConfig;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::http::TimedClient;
use crate::location::CoordinateSource;
use crate::types::{Coordinates, WeatherError};

/// Providers disagree on whether coordinates are numbers or strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        match self {
            Degrees::Number(n) => Some(*n),
            Degrees::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    latitude: Option<Degrees>,
    #[serde(default)]
    longitude: Option<Degrees>,
}

#[derive(Debug, Clone)]
pub struct IpLocator {
    http: TimedClient,
    url: String,
    timeout: Duration,
}

impl IpLocator {
    pub fn new(http: TimedClient, config: &WeatherConfig) -> Self {
        Self {
            http,
            url: config.endpoints.ip_geolocation_url.clone(),
            timeout: config.timeouts.ip(),
        }
    }

    /// Approximate position of this host's public IP, or `None`.
    #[instrument(skip(self), level = "info")]
    pub async fn lookup(&self) -> Option<Coordinates> {
        match self.try_lookup().await {
            Ok(position) => {
                tracing::info!(
                    lat = position.latitude(),
                    lon = position.longitude(),
                    "IP geolocation resolved"
                );
                Some(position)
            }
            Err(e) => {
                tracing::warn!(error = %e, "IP geolocation failed");
                None
            }
        }
    }

    async fn try_lookup(&self) -> Result<Coordinates, WeatherError> {
        let url = Url::parse(&self.url)
            .map_err(|e| WeatherError::Parse(format!("invalid endpoint {}: {e}", self.url)))?;
        let body: IpLookupResponse = self.http.get_json(url, self.timeout).await?;

        let latitude = body.latitude.as_ref().and_then(Degrees::value);
        let longitude = body.longitude.as_ref().and_then(Degrees::value);
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => Err(WeatherError::Parse(
                "response has no usable latitude/longitude".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CoordinateSource for IpLocator {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> Option<Coordinates> {
        self.lookup().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn locator_with(body: ResponseTemplate) -> (MockServer, IpLocator) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(body)
            .mount(&mock_server)
            .await;

        let mut config = WeatherConfig::default();
        config.endpoints.ip_geolocation_url = format!("{}/json/", mock_server.uri());
        config.timeouts.ip_ms = 200;
        let locator = IpLocator::new(TimedClient::new().unwrap(), &config);
        (mock_server, locator)
    }

    #[tokio::test]
    async fn test_numeric_coordinates() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"latitude": 51.5, "longitude": -0.12})),
        )
        .await;
        assert_eq!(
            locator.lookup().await,
            Some(Coordinates::new(51.5, -0.12).unwrap())
        );
    }

    #[tokio::test]
    async fn test_string_coordinates() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"latitude": "30.73", "longitude": " 76.78 "})),
        )
        .await;
        assert_eq!(
            locator.lookup().await,
            Some(Coordinates::new(30.73, 76.78).unwrap())
        );
    }

    #[tokio::test]
    async fn test_missing_coordinates_is_none() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"error": true, "reason": "RateLimited"})),
        )
        .await;
        assert_eq!(locator.lookup().await, None);
    }

    #[tokio::test]
    async fn test_unparseable_coordinates_is_none() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"latitude": "north", "longitude": 10})),
        )
        .await;
        assert_eq!(locator.lookup().await, None);
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_is_none() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"latitude": 123.0, "longitude": 10.0})),
        )
        .await;
        assert_eq!(locator.lookup().await, None);
    }

    #[tokio::test]
    async fn test_server_error_is_none() {
        let (_server, locator) = locator_with(ResponseTemplate::new(429)).await;
        assert_eq!(locator.lookup().await, None);
    }

    #[tokio::test]
    async fn test_timeout_is_none() {
        let (_server, locator) = locator_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"latitude": 1.0, "longitude": 1.0}))
                .set_delay(Duration::from_secs(2)),
        )
        .await;
        assert_eq!(locator.lookup().await, None);
    }
}
