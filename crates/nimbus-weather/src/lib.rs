//! Weather pipeline for Nimbus
//!
//! Resolves a place from free text, device position or IP geolocation,
//! fetches an Open-Meteo forecast for it and keeps the last result in a
//! single-slot cache.

pub mod cache;
pub mod geocode;
pub mod http;
pub mod ip_locate;
pub mod loading;
pub mod location;
pub mod orchestrator;
pub mod outlook;
pub mod provider;
pub mod render;
pub mod session;
pub mod types;
pub mod units;

pub use cache::{CacheLookup, CacheStore, FileCacheStore, MemoryCacheStore, WeatherCache};
pub use geocode::{query_variants, Geocoder};
pub use http::TimedClient;
pub use ip_locate::IpLocator;
pub use location::{
    CoordinateSource, DeviceLocator, FixedLocator, PositionOptions, UnavailableLocator,
};
pub use orchestrator::Orchestrator;
pub use outlook::HourlyOutlook;
pub use provider::WeatherProvider;
pub use render::RenderSink;
pub use session::{FlowState, Session};
pub use types::*;
