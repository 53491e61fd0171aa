//! Next-24-hours summary derived from the hourly series.

use chrono::NaiveDateTime;

use crate::types::HourlySeries;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A window of the hourly series starting at the current hour
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyOutlook {
    pub start_index: usize,
    pub temperatures: Vec<f64>,
    pub precipitation: Vec<f64>,
}

impl HourlyOutlook {
    /// Take up to `hours` entries beginning with the first timestamp not
    /// earlier than `now` (local time at the forecast location). When every
    /// timestamp is in the past the window starts at the beginning.
    pub fn upcoming(hourly: &HourlySeries, now: NaiveDateTime, hours: usize) -> Option<Self> {
        if hourly.time.is_empty() {
            return None;
        }

        let start_index = hourly
            .time
            .iter()
            .position(|t| {
                NaiveDateTime::parse_from_str(t, TIME_FORMAT)
                    .map(|t| t >= now)
                    .unwrap_or(false)
            })
            .unwrap_or(0);

        let window = |values: &[Option<f64>]| -> Vec<f64> {
            values
                .iter()
                .skip(start_index)
                .take(hours)
                .flatten()
                .copied()
                .collect()
        };

        Some(Self {
            start_index,
            temperatures: window(&hourly.temperature_2m),
            precipitation: window(&hourly.precipitation_probability),
        })
    }

    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        range(&self.temperatures)
    }

    pub fn precipitation_range(&self) -> Option<(f64, f64)> {
        range(&self.precipitation)
    }
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}
