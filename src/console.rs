//! Terminal renderer for the CLI.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use nimbus_core::TemperatureUnit;
use nimbus_weather::units::unit_symbol;
use nimbus_weather::{ForecastSnapshot, HourlyOutlook, Place, RenderSink, WeatherCondition};

const OUTLOOK_HOURS: usize = 24;

/// Prints forecasts to stdout and status lines to stderr
pub struct ConsoleSink {
    unit: TemperatureUnit,
}

impl ConsoleSink {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self { unit }
    }
}

impl RenderSink for ConsoleSink {
    fn render(&self, place: &Place, data: &ForecastSnapshot) {
        println!("{}", format_report(place, data, self.unit, Utc::now()));
    }

    fn set_status(&self, message: &str, is_error: bool) {
        if message.is_empty() {
            return;
        }
        if is_error {
            eprintln!("error: {message}");
        } else {
            eprintln!("{message}");
        }
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            eprintln!("Loading...");
        }
    }
}

fn temp(value: Option<f64>, symbol: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{symbol}"),
        None => "--".to_string(),
    }
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}%"),
        None => "--".to_string(),
    }
}

/// "HH:MM" part of an ISO local timestamp
fn clock(value: Option<&str>) -> &str {
    value
        .and_then(|v| v.split_once('T').map(|(_, time)| time))
        .unwrap_or("--")
}

pub fn format_report(
    place: &Place,
    data: &ForecastSnapshot,
    unit: TemperatureUnit,
    now: DateTime<Utc>,
) -> String {
    let data = data.converted(unit);
    let symbol = unit_symbol(unit);
    let current = &data.current;
    let condition = current.condition().unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{}", place.name());
    let _ = writeln!(
        out,
        "  {} [{} / {}]",
        condition.description(),
        condition.icon_name(current.is_day()),
        condition.theme().as_str()
    );
    let _ = writeln!(
        out,
        "  {}, feels like {}",
        temp(current.temperature_2m, symbol),
        temp(current.apparent_temperature, symbol)
    );
    let _ = writeln!(
        out,
        "  Humidity {}  Wind {}  UV {}",
        percent(current.relative_humidity_2m),
        current
            .wind_speed_10m
            .map_or_else(|| "--".to_string(), |w| format!("{w:.1} km/h")),
        data.uv_index()
            .map_or_else(|| "--".to_string(), |uv| format!("{uv:.1}"))
    );

    if let Some(outlook) = HourlyOutlook::upcoming(&data.hourly, data.local_time(now), OUTLOOK_HOURS) {
        if let Some((lo, hi)) = outlook.temperature_range() {
            let rain = outlook
                .precipitation_range()
                .map(|(_, max)| format!(", rain up to {max:.0}%"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  Next {}h: {} to {}{rain}",
                outlook.temperatures.len(),
                temp(Some(lo), symbol),
                temp(Some(hi), symbol)
            );
        }
    }

    let daily = &data.daily;
    let _ = writeln!(
        out,
        "  Sunrise {}  Sunset {}",
        clock(daily.sunrise.first().and_then(|s| s.as_deref())),
        clock(daily.sunset.first().and_then(|s| s.as_deref()))
    );

    for (i, day) in daily.time.iter().enumerate() {
        let condition = daily
            .weather_code
            .get(i)
            .copied()
            .flatten()
            .map(WeatherCondition::from_wmo_code)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {day}  {:<14} {:>8} / {:<8} {:>4}",
            condition.description(),
            temp(daily.temperature_2m_max.get(i).copied().flatten(), symbol),
            temp(daily.temperature_2m_min.get(i).copied().flatten(), symbol),
            percent(daily.precipitation_probability_max.get(i).copied().flatten())
        );
    }

    out.trim_end().to_string()
}
