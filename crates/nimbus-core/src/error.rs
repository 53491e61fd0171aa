//! Error types shared by the Nimbus crates.
//!
//! Every error carries a short `user_message()` for the dashboard status
//! line; the `Display` text keeps the detail for logs.

use thiserror::Error;

/// Failure that ends the `nimbus` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A weather flow ended without a forecast on screen
    #[error("Weather error: {0}")]
    Weather(String),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather(_) => "No forecast could be loaded. Try another city.",
        }
    }
}

/// Transport-level failures talking to a weather, geocoding or IP provider.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Couldn't reach the weather service. Check your connection."
            }
            NetworkError::Timeout => "The weather service took too long to respond.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is unavailable right now."
            }
            NetworkError::ServerError { .. } => "The weather service rejected the request.",
            NetworkError::InvalidResponse(_) => "The weather service sent an unreadable response.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check config.toml.",
            ConfigError::ParseError(_) => "config.toml is malformed.",
        }
    }
}

/// Classify a `reqwest` failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        match self.status() {
            _ if self.is_timeout() => NetworkError::Timeout,
            _ if self.is_decode() || self.is_body() => {
                NetworkError::InvalidResponse(self.to_string())
            }
            Some(status) => NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            },
            None => NetworkError::ConnectionFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts_into_app_error() {
        let app_err: AppError = ConfigError::Invalid("weather.default_location".into()).into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
        assert_eq!(app_err.user_message(), "Invalid configuration. Check config.toml.");
    }

    #[test]
    fn test_weather_error_keeps_detail_in_display() {
        let app_err = AppError::Weather("Place not found".into());
        assert_eq!(app_err.to_string(), "Weather error: Place not found");
        assert!(app_err.user_message().starts_with("No forecast"));
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let outage = NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        let rejected = NetworkError::ServerError {
            status: 400,
            message: "bad request".into(),
        };
        assert!(outage.user_message().contains("unavailable"));
        assert!(rejected.user_message().contains("rejected"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_failed() {
        let err = reqwest::get("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(
            err.into_network_error(),
            NetworkError::ConnectionFailed(_)
        ));
    }
}
