//! HTTP GET with a client-side time budget.
//!
//! The whole exchange (connect, status, body) runs inside
//! `tokio::time::timeout`. When the budget expires the request future is
//! dropped, which aborts the in-flight request and releases the timer.

use std::time::Duration;

use nimbus_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::WeatherError;

const USER_AGENT: &str = concat!("Nimbus/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct TimedClient {
    client: Client,
}

impl TimedClient {
    pub fn new() -> Result<Self, WeatherError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    /// GET `url` and decode a JSON body, giving up after `limit`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        limit: Duration,
    ) -> Result<T, WeatherError> {
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| e.into_network_error())?;

            let status = response.status();
            if !status.is_success() {
                return Err(NetworkError::ServerError {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string(),
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
        };

        match tokio::time::timeout(limit, request).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(NetworkError::Timeout)) | Err(_) => {
                tracing::debug!(url = %url, ?limit, "request exceeded its time budget");
                Err(WeatherError::Timeout)
            }
            Ok(Err(e)) => Err(WeatherError::Network(e)),
        }
    }
}

/// Build a URL with query parameters, mapping parse failures into our error type.
pub fn build_url<I, K, V>(base: &str, params: I) -> Result<Url, WeatherError>
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<(K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Url::parse_with_params(base, params)
        .map_err(|e| WeatherError::Parse(format!("invalid endpoint {base}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let client = TimedClient::new().unwrap();
        let url = build_url(&format!("{}/echo", mock_server.uri()), [("a", "1")]).unwrap();
        let echo: Echo = client.get_json(url, Duration::from_secs(2)).await.unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_get_json_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = TimedClient::new().unwrap();
        let url = build_url(&mock_server.uri(), std::iter::empty::<(&str, &str)>()).unwrap();
        let result = client
            .get_json::<Echo>(url, Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(WeatherError::Timeout)));
    }

    #[tokio::test]
    async fn test_get_json_non_success_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = TimedClient::new().unwrap();
        let url = build_url(&mock_server.uri(), std::iter::empty::<(&str, &str)>()).unwrap();
        let result = client.get_json::<Echo>(url, Duration::from_secs(2)).await;
        assert!(matches!(
            result,
            Err(WeatherError::Network(NetworkError::ServerError { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = TimedClient::new().unwrap();
        let url = build_url(&mock_server.uri(), std::iter::empty::<(&str, &str)>()).unwrap();
        let result = client.get_json::<Echo>(url, Duration::from_secs(2)).await;
        assert!(matches!(
            result,
            Err(WeatherError::Network(NetworkError::InvalidResponse(_)))
        ));
    }
}
