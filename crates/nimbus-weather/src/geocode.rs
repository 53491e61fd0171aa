//! Forward and reverse geocoding against the Open-Meteo geocoding API.
//!
//! Free-text queries are ambiguous, so forward geocoding walks an ordered list
//! of query variants and stops at the first one that yields a match. Reverse
//! geocoding never fails; it degrades to a coordinate-named place.

use std::time::Duration;

use nimbus_core::WeatherConfig;
use serde::Deserialize;
use tracing::instrument;

use crate::http::{build_url, TimedClient};
use crate::types::{Coordinates, Place, WeatherError};

const MAX_RESULTS: &str = "5";
const LANGUAGE: &str = "en";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodingHit {
    name: String,
    #[serde(default)]
    admin1: Option<String>,
    #[serde(default)]
    country: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timezone: Option<String>,
}

impl GeocodingHit {
    /// "Name, Region, Country" with empty parts left out
    fn display_name(&self) -> String {
        [
            Some(self.name.as_str()),
            self.admin1.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    fn into_place(self) -> Result<Place, WeatherError> {
        let name = self.display_name();
        Place::new(
            name,
            self.latitude,
            self.longitude,
            self.timezone.unwrap_or_default(),
        )
    }
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered lookup candidates for a free-text query.
///
/// Empty candidates are skipped; duplicates are kept so a comma-free query
/// is tried twice before the default.
pub fn query_variants(raw: &str, regional_qualifier: &str, default_location: &str) -> Vec<String> {
    let mut variants = Vec::with_capacity(4);
    let full = normalize(raw);
    if !full.is_empty() {
        variants.push(full.clone());
    }

    let parts: Vec<String> = full
        .split(',')
        .map(normalize)
        .filter(|part| !part.is_empty())
        .collect();

    if let Some(first) = parts.first() {
        variants.push(first.clone());
        if let Some(second) = parts.get(1) {
            variants.push(format!("{first}, {second}, {regional_qualifier}"));
        }
    }

    let default_location = normalize(default_location);
    if !default_location.is_empty() {
        variants.push(default_location);
    }
    variants
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: TimedClient,
    search_url: String,
    reverse_url: String,
    timeout: Duration,
    regional_qualifier: String,
    default_location: String,
}

impl Geocoder {
    pub fn new(http: TimedClient, config: &WeatherConfig) -> Self {
        Self {
            http,
            search_url: config.endpoints.geocoding_url.clone(),
            reverse_url: config.endpoints.reverse_geocoding_url.clone(),
            timeout: config.timeouts.geocode(),
            regional_qualifier: config.regional_qualifier.clone(),
            default_location: config.default_location.clone(),
        }
    }

    /// Resolve free text to a place, trying each query variant in order.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Place, WeatherError> {
        let candidates = query_variants(query, &self.regional_qualifier, &self.default_location);

        for (index, candidate) in candidates.iter().enumerate() {
            match self.search(candidate).await {
                Ok(Some(place)) => {
                    tracing::info!(
                        candidate = %candidate,
                        index,
                        place = %place.name(),
                        "Geocoded query"
                    );
                    return Ok(place);
                }
                Ok(None) => {
                    tracing::debug!(candidate = %candidate, "No geocoding match");
                }
                Err(e) => {
                    tracing::debug!(candidate = %candidate, error = %e, "Geocoding lookup failed");
                }
            }
        }

        tracing::warn!(query, "Every geocoding candidate exhausted");
        Err(WeatherError::NotFound)
    }

    async fn search(&self, candidate: &str) -> Result<Option<Place>, WeatherError> {
        let url = build_url(
            &self.search_url,
            [
                ("name", candidate),
                ("count", MAX_RESULTS),
                ("language", LANGUAGE),
                ("format", "json"),
            ],
        )?;
        let body: GeocodingResponse = self.http.get_json(url, self.timeout).await?;
        body.results
            .into_iter()
            .next()
            .map(GeocodingHit::into_place)
            .transpose()
    }

    /// Name a position. Falls back to "Lat .., Lon .." with an `auto` timezone
    /// when the provider can't.
    #[instrument(skip(self), level = "info")]
    pub async fn reverse(&self, coords: Coordinates) -> Place {
        match self.reverse_lookup(coords).await {
            Ok(Some(place)) => {
                tracing::info!(place = %place.name(), "Reverse geocoded");
                place
            }
            Ok(None) => {
                tracing::debug!("Reverse geocoding returned no results");
                Place::unnamed(coords)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Reverse geocoding failed");
                Place::unnamed(coords)
            }
        }
    }

    async fn reverse_lookup(&self, coords: Coordinates) -> Result<Option<Place>, WeatherError> {
        let latitude = coords.latitude().to_string();
        let longitude = coords.longitude().to_string();
        let url = build_url(
            &self.reverse_url,
            [
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("language", LANGUAGE),
                ("format", "json"),
            ],
        )?;
        let body: GeocodingResponse = self.http.get_json(url, self.timeout).await?;
        body.results
            .into_iter()
            .next()
            .map(GeocodingHit::into_place)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALIFIER: &str = "India";
    const DEFAULT: &str = "Chandigarh, India";

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  New \t  York \n"), "New York");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_variants_without_comma() {
        let variants = query_variants("  Paris ", QUALIFIER, DEFAULT);
        assert_eq!(variants, vec!["Paris", "Paris", DEFAULT]);
    }

    #[test]
    fn test_variants_with_two_segments() {
        let variants = query_variants("Kharar,  Punjab", QUALIFIER, DEFAULT);
        assert_eq!(
            variants,
            vec!["Kharar, Punjab", "Kharar", "Kharar, Punjab, India", DEFAULT]
        );
    }

    #[test]
    fn test_variants_use_only_first_two_segments() {
        let variants = query_variants("Springfield, Illinois, USA", QUALIFIER, DEFAULT);
        assert_eq!(variants[2], "Springfield, Illinois, India");
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn test_variants_skip_empty_candidates() {
        assert_eq!(query_variants("   ", QUALIFIER, DEFAULT), vec![DEFAULT]);
        assert_eq!(
            query_variants(", , Delhi", QUALIFIER, DEFAULT),
            vec![", , Delhi", "Delhi", DEFAULT]
        );
    }

    #[test]
    fn test_display_name_omits_empty_parts() {
        let hit = GeocodingHit {
            name: "Paris".into(),
            admin1: Some("".into()),
            country: Some("France".into()),
            latitude: 48.85,
            longitude: 2.35,
            timezone: None,
        };
        assert_eq!(hit.display_name(), "Paris, France");
        let place = hit.into_place().unwrap();
        assert_eq!(place.timezone(), "auto");
    }
}
