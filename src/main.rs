mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nimbus_core::{AppError, Config, TemperatureUnit};
use nimbus_weather::{
    Coordinates, FileCacheStore, Orchestrator, Session, UnavailableLocator, WeatherCache,
    WeatherError,
};
use tracing::{error, info};

use crate::console::ConsoleSink;

/// Nimbus weather dashboard
#[derive(Parser)]
#[command(name = "nimbus", version, about = "Current conditions and 7-day forecast")]
struct Cli {
    /// City to look up, e.g. "Kharar, Punjab". Skips location detection.
    #[arg(long)]
    city: Option<String>,

    /// Latitude of the position to show (requires --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the position to show (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Path to the config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show temperatures in Fahrenheit
    #[arg(long)]
    fahrenheit: bool,

    /// Discard the cached forecast before loading
    #[arg(long)]
    clear_cache: bool,
}

fn weather_error(err: WeatherError) -> AppError {
    AppError::Weather(err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    nimbus_core::init()?;

    let (config, _) = Config::load_validated(cli.config.as_deref())?;
    let mut weather = config.weather.clone();
    if cli.fahrenheit {
        weather.temperature_unit = TemperatureUnit::Fahrenheit;
    }

    let store = Arc::new(FileCacheStore::new(&config.cache_dir()));
    let cache = WeatherCache::new(store, weather.cache_ttl());
    let sink = Arc::new(ConsoleSink::new(weather.temperature_unit));
    let orchestrator = Orchestrator::new(&weather, cache, Arc::new(UnavailableLocator), sink)
        .map_err(weather_error)?;

    if cli.clear_cache {
        orchestrator.clear_cache().map_err(weather_error)?;
        info!("Forecast cache cleared");
    }

    let session = Session::new();
    let outcome = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => {
            let coords = Coordinates::new(lat, lon).map_err(weather_error)?;
            orchestrator.update_by_coords(&session, coords).await
        }
        _ => orchestrator.startup(&session, cli.city.as_deref()).await,
    };

    match outcome {
        Ok(place) => {
            info!(
                place = %place.name(),
                renders = session.render_count(),
                "Forecast shown"
            );
            Ok(())
        }
        Err(e) => {
            let err = weather_error(e);
            error!(error = %err, "No forecast could be shown");
            Err(err.into())
        }
    }
}
