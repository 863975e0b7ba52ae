//! Weather observations and projected data points.

use serde::{Deserialize, Serialize};

/// Maximum number of measures a single projection may carry.
pub const MAX_PROJECTED_MEASURES: usize = 5;

/// Names of every plottable measure, in storage column order.
pub const MEASURES: &[&str] = &[
    "visibility",
    "temp",
    "temp_min",
    "temp_max",
    "feels_like",
    "pressure",
    "sea_level",
    "grnd_level",
    "humidity",
    "wind_speed",
    "wind_deg",
    "clouds_all",
    "rain_1h",
    "snow_1h",
];

/// One observation pulled from the upstream weather API.
///
/// `dt` is the primary key. `weather` holds the upstream condition ids
/// joined with commas; see [`crate::conditions::ConditionCatalog::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub dt: i64,
    pub visibility: i64,

    // Sys
    pub sunrise: i64,
    pub sunset: i64,

    // Main
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub sea_level: f64,
    pub grnd_level: f64,
    pub humidity: i64,

    // Wind
    pub wind_speed: f64,
    pub wind_deg: f64,

    // Clouds
    pub clouds_all: i64,

    // Precipitation over the last hour
    pub rain_1h: f64,
    pub snow_1h: f64,

    #[serde(default)]
    pub weather: String,
}

impl Record {
    /// Value of the named measure as a float, or `None` if the name is not a measure.
    pub fn measure(&self, name: &str) -> Option<f64> {
        let value = match name {
            "visibility" => self.visibility as f64,
            "temp" => self.temp,
            "temp_min" => self.temp_min,
            "temp_max" => self.temp_max,
            "feels_like" => self.feels_like,
            "pressure" => self.pressure,
            "sea_level" => self.sea_level,
            "grnd_level" => self.grnd_level,
            "humidity" => self.humidity as f64,
            "wind_speed" => self.wind_speed,
            "wind_deg" => self.wind_deg,
            "clouds_all" => self.clouds_all as f64,
            "rain_1h" => self.rain_1h,
            "snow_1h" => self.snow_1h,
            _ => return None,
        };
        Some(value)
    }

    /// Condition ids carried by this record, in upstream order.
    pub fn weather_ids(&self) -> impl Iterator<Item = &str> {
        self.weather.split(',').map(str::trim).filter(|id| !id.is_empty())
    }

    /// Whether the observation was taken between sunrise and sunset (both exclusive).
    pub fn is_daytime(&self) -> bool {
        self.dt > self.sunrise && self.dt < self.sunset
    }
}

/// A timestamp plus up to [`MAX_PROJECTED_MEASURES`] values, in request order.
/// Slots past the requested measures are `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub dt: i64,
    pub values: [f64; MAX_PROJECTED_MEASURES],
}

impl DataPoint {
    /// Build a point from a record, projecting `columns` in order.
    ///
    /// Columns that are not measures project as `0.0`; callers validate first.
    pub fn project(record: &Record, columns: &[String]) -> Self {
        let mut values = [0.0; MAX_PROJECTED_MEASURES];
        for (slot, column) in values.iter_mut().zip(columns) {
            *slot = record.measure(column).unwrap_or_default();
        }
        Self {
            dt: record.dt,
            values,
        }
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or_default()
    }
}

const DIRECTIONS: [&str; 8] = ["↑", "↗", "→", "↘", "↓", "↙", "←", "↖"];

/// Eight-point arrow for a bearing in degrees. Negative bearings have no direction.
pub fn wind_direction(deg: f64) -> &'static str {
    if deg < 0.0 || !deg.is_finite() {
        return "";
    }
    DIRECTIONS[((deg + 22.5) / 45.0) as usize % DIRECTIONS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            dt: 1_700_000_000,
            sunrise: 1_699_990_000,
            sunset: 1_700_030_000,
            temp: 14.2,
            temp_min: 12.0,
            temp_max: 16.5,
            feels_like: 13.1,
            pressure: 1013.0,
            humidity: 71,
            clouds_all: 40,
            weather: "800,501".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn every_listed_measure_is_readable() {
        let record = sample();
        for name in MEASURES {
            assert!(record.measure(name).is_some(), "{name} should be a measure");
        }
        assert_eq!(record.measure("dt"), None);
        assert_eq!(record.measure("weather"), None);
    }

    #[test]
    fn integer_measures_widen_to_float() {
        let record = sample();
        assert_eq!(record.measure("humidity"), Some(71.0));
        assert_eq!(record.measure("clouds_all"), Some(40.0));
    }

    #[test]
    fn projection_keeps_request_order_and_zero_fills() {
        let record = sample();
        let columns = vec!["temp_max".to_string(), "temp".to_string()];
        let point = DataPoint::project(&record, &columns);
        assert_eq!(point.dt, record.dt);
        assert_eq!(point.values, [16.5, 14.2, 0.0, 0.0, 0.0]);
        assert_eq!(point.value(7), 0.0);
    }

    #[test]
    fn weather_ids_skip_blanks() {
        let mut record = sample();
        assert_eq!(record.weather_ids().collect::<Vec<_>>(), vec!["800", "501"]);
        record.weather = String::new();
        assert_eq!(record.weather_ids().count(), 0);
    }

    #[test]
    fn daytime_is_strictly_between_sunrise_and_sunset() {
        let mut record = sample();
        assert!(record.is_daytime());
        record.dt = record.sunrise;
        assert!(!record.is_daytime());
    }

    #[test]
    fn wind_direction_buckets() {
        assert_eq!(wind_direction(0.0), "↑");
        assert_eq!(wind_direction(44.0), "↗");
        assert_eq!(wind_direction(180.0), "↓");
        assert_eq!(wind_direction(350.0), "↑");
        assert_eq!(wind_direction(-1.0), "");
    }
}
