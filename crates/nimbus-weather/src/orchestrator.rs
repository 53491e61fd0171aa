//! Resolution orchestrator: ties geocoding, position sources, the forecast
//! fetcher and the cache into the three entry flows (city text, coordinates,
//! startup auto-detect).
//!
//! Flow states: `Idle -> Resolving -> Fetching -> Rendered`, or `Failed`.
//! A failed coordinate flow re-enters `Resolving` through the next fallback
//! strategy until the list runs out, then settles on the default location.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use nimbus_core::{RacePolicy, WeatherConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheLookup, WeatherCache};
use crate::geocode::{normalize, Geocoder};
use crate::http::TimedClient;
use crate::ip_locate::IpLocator;
use crate::loading;
use crate::location::{request_position, CoordinateSource, DeviceLocator, PositionOptions};
use crate::provider::WeatherProvider;
use crate::render::RenderSink;
use crate::session::{FlowState, Session};
use crate::types::{Coordinates, LocationError, Place, WeatherError};

pub const STATUS_SEARCHING: &str = "Searching...";
pub const STATUS_FETCHING: &str = "Fetching forecast...";
pub const STATUS_LOCATING: &str = "Fetching your location weather...";
pub const STATUS_RECENT: &str = "Showing recent data";
pub const STATUS_LOCATION_FAILED: &str = "Failed to load your location. Type a city to search.";

/// Whether a flow may talk to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Foreground,
    /// Refreshing behind a cached render: no statuses, no spinner, no errors
    Background,
}

pub struct Orchestrator {
    config: WeatherConfig,
    geocoder: Geocoder,
    provider: WeatherProvider,
    ip: IpLocator,
    device: Arc<dyn DeviceLocator>,
    cache: WeatherCache,
    sink: Arc<dyn RenderSink>,
}

impl Orchestrator {
    pub fn new(
        config: &WeatherConfig,
        cache: WeatherCache,
        device: Arc<dyn DeviceLocator>,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self, WeatherError> {
        let http = TimedClient::new()?;
        Ok(Self {
            config: config.clone(),
            geocoder: Geocoder::new(http.clone(), config),
            provider: WeatherProvider::new(http.clone(), config),
            ip: IpLocator::new(http, config),
            device,
            cache,
            sink,
        })
    }

    /// Path (a): resolve free text and show its forecast. Failures are terminal.
    pub async fn update_by_city(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Place, WeatherError> {
        if normalize(query).is_empty() {
            let err = WeatherError::EmptyQuery;
            self.set_status(session, Mode::Foreground, err.user_message(), true);
            return Err(err);
        }
        self.with_loading(self.city_flow(session, query, Mode::Foreground))
            .await
    }

    /// Path (b): show the forecast for a position, falling back to IP
    /// geolocation and then to the default location.
    pub async fn update_by_coords(
        &self,
        session: &Session,
        coords: Coordinates,
    ) -> Result<Place, WeatherError> {
        let fallbacks: [&dyn CoordinateSource; 1] = [&self.ip];
        self.with_loading(self.coords_flow(session, Some(coords), &fallbacks, Mode::Foreground))
            .await
    }

    /// Path (c): first load. A fresh cache entry is shown at once and the
    /// rest runs as a silent refresh whose failure keeps the cached render.
    pub async fn startup(
        &self,
        session: &Session,
        query: Option<&str>,
    ) -> Result<Place, WeatherError> {
        let (mode, cached) = match self.cache.lookup(Utc::now()) {
            CacheLookup::Fresh(entry) => {
                info!(place = %entry.place.name(), "Showing cached forecast");
                self.sink.render(&entry.place, &entry.data);
                let place = entry.place.clone();
                session.record_render(entry.place, entry.data);
                self.set_status(session, Mode::Foreground, STATUS_RECENT, false);
                (Mode::Background, Some(place))
            }
            CacheLookup::Stale(entry) => {
                debug!(place = %entry.place.name(), "Cached forecast is stale");
                (Mode::Foreground, None)
            }
            CacheLookup::Missing => (Mode::Foreground, None),
        };

        let query = query.map(normalize).filter(|q| !q.is_empty());
        let flow = async {
            match &query {
                Some(query) => self.city_flow(session, query, mode).await,
                None => self.auto_detect(session, mode).await,
            }
        };

        match mode {
            Mode::Foreground => self.with_loading(flow).await,
            Mode::Background => match (flow.await, cached) {
                (Ok(place), _) => Ok(place),
                (Err(e), Some(place)) => {
                    warn!(error = %e, "Background refresh failed; keeping cached forecast");
                    session.transition(FlowState::Rendered);
                    Ok(place)
                }
                (Err(e), None) => Err(e),
            },
        }
    }

    pub fn clear_cache(&self) -> Result<(), WeatherError> {
        self.cache.clear()
    }

    async fn city_flow(
        &self,
        session: &Session,
        query: &str,
        mode: Mode,
    ) -> Result<Place, WeatherError> {
        self.set_status(session, mode, STATUS_SEARCHING, false);
        session.transition(FlowState::Resolving);

        let result = async {
            let place = self.geocoder.resolve(query).await?;
            self.set_status(session, mode, STATUS_FETCHING, false);
            self.fetch_and_render(session, place, mode).await
        }
        .await;

        if let Err(e) = &result {
            warn!(query, error = %e, "City lookup failed");
            session.transition(FlowState::Failed);
            self.set_status(session, mode, e.user_message(), true);
        }
        result
    }

    /// Try `start`, then each fallback source in order. A source that yields a
    /// position re-enters the coordinate path with only the sources after it.
    async fn coords_flow(
        &self,
        session: &Session,
        start: Option<Coordinates>,
        fallbacks: &[&dyn CoordinateSource],
        mode: Mode,
    ) -> Result<Place, WeatherError> {
        let mut next = start;
        let mut remaining = fallbacks;

        loop {
            if let Some(coords) = next.take() {
                self.set_status(session, mode, STATUS_LOCATING, false);
                session.transition(FlowState::Resolving);
                let place = self.geocoder.reverse(coords).await;
                match self.fetch_and_render(session, place, mode).await {
                    Ok(place) => return Ok(place),
                    Err(e) => {
                        session.transition(FlowState::Failed);
                        warn!(
                            lat = coords.latitude(),
                            lon = coords.longitude(),
                            error = %e,
                            "Forecast for position failed; falling back"
                        );
                    }
                }
            }

            let Some((source, rest)) = remaining.split_first() else {
                break;
            };
            remaining = rest;
            next = source.locate().await;
            if next.is_none() {
                info!(source = source.name(), "Fallback source produced no position");
            }
        }

        self.default_flow(session, mode).await
    }

    /// Last resort after every position source failed: degraded, not an error.
    async fn default_flow(&self, session: &Session, mode: Mode) -> Result<Place, WeatherError> {
        let default = &self.config.default_location;
        info!(location = %default, "Falling back to default location");

        match self.city_flow(session, default, mode).await {
            Ok(place) => {
                // Announced in both modes: the render replaced whatever was on screen
                let notice = format!("Couldn't determine your location. Showing {default}.");
                session.record_status(&notice);
                self.sink.set_status(&notice, false);
                Ok(place)
            }
            Err(e) => {
                self.set_status(session, mode, STATUS_LOCATION_FAILED, true);
                Err(e)
            }
        }
    }

    async fn auto_detect(&self, session: &Session, mode: Mode) -> Result<Place, WeatherError> {
        let cancel = CancellationToken::new();
        let options = PositionOptions {
            timeout: self.config.timeouts.device(),
            maximum_age: self.config.timeouts.device_max_age(),
        };
        let fallbacks: [&dyn CoordinateSource; 1] = [&self.ip];

        session.transition(FlowState::Resolving);
        let device = request_position(self.device.as_ref(), options, cancel.clone());
        tokio::pin!(device);

        // Nothing on screen yet: don't let a slow device keep it blank
        if mode == Mode::Foreground {
            tokio::select! {
                biased;
                position = &mut device => {
                    return self.after_device(session, position, &fallbacks, mode).await;
                }
                () = tokio::time::sleep(self.config.timeouts.fallback_timer()) => {}
            }

            info!(
                policy = ?self.config.race_policy,
                "Device location still pending; starting default location"
            );
            let default = &self.config.default_location;
            return match self.config.race_policy {
                RacePolicy::CancelSuperseded => {
                    cancel.cancel();
                    self.city_flow(session, default, mode).await
                }
                RacePolicy::LastResultWins => {
                    let late = async {
                        let position = device.await;
                        self.after_device(session, position, &fallbacks, mode).await
                    };
                    let (fallback, late) = tokio::join!(self.city_flow(session, default, mode), late);
                    late.or(fallback)
                }
            };
        }

        let position = device.await;
        self.after_device(session, position, &fallbacks, mode).await
    }

    async fn after_device(
        &self,
        session: &Session,
        position: Result<Coordinates, LocationError>,
        fallbacks: &[&dyn CoordinateSource],
        mode: Mode,
    ) -> Result<Place, WeatherError> {
        match position {
            Ok(coords) => {
                info!(
                    lat = coords.latitude(),
                    lon = coords.longitude(),
                    "Device location resolved"
                );
                self.coords_flow(session, Some(coords), fallbacks, mode).await
            }
            Err(e) => {
                info!(error = %e, "Device location failed");
                self.coords_flow(session, None, fallbacks, mode).await
            }
        }
    }

    async fn fetch_and_render(
        &self,
        session: &Session,
        place: Place,
        mode: Mode,
    ) -> Result<Place, WeatherError> {
        session.transition(FlowState::Fetching);
        let coords = place.coordinates();
        let data = self
            .provider
            .fetch(coords.latitude(), coords.longitude(), place.timezone())
            .await?;

        self.sink.render(&place, &data);
        if let Err(e) = self.cache.store(&place, &data, Utc::now()) {
            warn!(error = %e, "Failed to write forecast cache");
        }
        session.record_render(place.clone(), data);

        // Fresh data replaces any "recent data" notice, even in the background
        session.record_status("");
        self.sink.set_status("", false);
        debug!(place = %place.name(), ?mode, "Rendered forecast");
        Ok(place)
    }

    fn set_status(&self, session: &Session, mode: Mode, message: &str, is_error: bool) {
        if mode == Mode::Background {
            return;
        }
        session.record_status(message);
        self.sink.set_status(message, is_error);
    }

    async fn with_loading<F: Future>(&self, operation: F) -> F::Output {
        loading::debounced(
            self.sink.as_ref(),
            self.config.timeouts.loading_delay(),
            operation,
        )
        .await
    }
}
