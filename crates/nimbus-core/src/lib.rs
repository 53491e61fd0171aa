pub mod config;
pub mod error;

pub use config::{
    Config, ConfigIssue, EndpointConfig, RacePolicy, TemperatureUnit, TimeoutConfig,
    ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the Nimbus binaries
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Nimbus core initialized");
    Ok(())
}
