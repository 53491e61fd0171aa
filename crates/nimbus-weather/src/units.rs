//! Temperature unit conversion.
//!
//! Open-Meteo reports Celsius; conversion is the only transformation applied
//! to provider values before they reach a renderer.

use nimbus_core::TemperatureUnit;

use crate::types::ForecastSnapshot;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a Celsius reading into the preferred unit
pub fn from_celsius(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        TemperatureUnit::Auto | TemperatureUnit::Celsius => celsius,
    }
}

/// Degree suffix for display
pub fn unit_symbol(unit: TemperatureUnit) -> &'static str {
    match unit {
        TemperatureUnit::Fahrenheit => "°F",
        TemperatureUnit::Auto | TemperatureUnit::Celsius => "°C",
    }
}

impl ForecastSnapshot {
    /// Copy of this snapshot with every temperature field in `unit`.
    /// Non-temperature readings are left untouched.
    pub fn converted(&self, unit: TemperatureUnit) -> ForecastSnapshot {
        let mut out = self.clone();
        let convert = |value: Option<f64>| value.map(|c| from_celsius(c, unit));
        let convert_all = |values: &mut Vec<Option<f64>>| {
            for value in values.iter_mut() {
                *value = value.map(|c| from_celsius(c, unit));
            }
        };

        out.current.temperature_2m = convert(out.current.temperature_2m);
        out.current.apparent_temperature = convert(out.current.apparent_temperature);
        convert_all(&mut out.hourly.temperature_2m);
        convert_all(&mut out.daily.temperature_2m_max);
        convert_all(&mut out.daily.temperature_2m_min);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_points() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(fahrenheit_to_celsius(-40.0), -40.0);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        for x in [-273.15, -40.0, -0.5, 0.0, 21.7, 36.6, 1e6, -1e6, f64::MIN_POSITIVE] {
            let back = fahrenheit_to_celsius(celsius_to_fahrenheit(x));
            let tolerance = 1e-9 * x.abs().max(1.0);
            assert!((back - x).abs() <= tolerance, "{x} came back as {back}");
        }
    }

    #[test]
    fn test_converted_only_touches_temperatures() {
        let mut snapshot = ForecastSnapshot::default();
        snapshot.current.temperature_2m = Some(10.0);
        snapshot.current.apparent_temperature = Some(-10.0);
        snapshot.current.wind_speed_10m = Some(12.0);
        snapshot.hourly.temperature_2m = vec![Some(20.0), None];
        snapshot.hourly.precipitation_probability = vec![Some(30.0), Some(40.0)];
        snapshot.daily.temperature_2m_max = vec![Some(30.0)];
        snapshot.daily.temperature_2m_min = vec![Some(5.0)];

        let f = snapshot.converted(TemperatureUnit::Fahrenheit);
        assert_eq!(f.current.temperature_2m, Some(50.0));
        assert_eq!(f.current.apparent_temperature, Some(14.0));
        assert_eq!(f.current.wind_speed_10m, Some(12.0));
        assert_eq!(f.hourly.temperature_2m, vec![Some(68.0), None]);
        assert_eq!(f.hourly.precipitation_probability, vec![Some(30.0), Some(40.0)]);
        assert_eq!(f.daily.temperature_2m_max, vec![Some(86.0)]);
        assert_eq!(f.daily.temperature_2m_min, vec![Some(41.0)]);

        assert_eq!(snapshot.converted(TemperatureUnit::Auto), snapshot);
    }
}
