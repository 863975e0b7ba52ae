//! Observation ingestion.
//!
//! An [`ObservationSource`] produces the current observation; [`ingest_once`]
//! stores it, records the zone name and refreshes the latest-record slot.

use crate::constants::*;
use crate::state::AppState;
use crate::zone::persist_zone_if_absent;
use async_trait::async_trait;
use rainbbit_core::{ConfigError, IngestError, RainbbitResult, Record};
use serde::Deserialize;
use std::time::Duration;

/// One observation plus the location name the source reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub record: Record,
    pub zone: String,
}

/// Something that can report the current weather.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn fetch_current(&self) -> Result<Observation, IngestError>;
}

/// Pull one observation and persist it.
///
/// The latest-record slot is invalidated only after the record is stored. A
/// failed fetch or insert leaves the caches untouched.
pub async fn ingest_once(state: &AppState, source: &dyn ObservationSource) -> RainbbitResult<Record> {
    let Observation { record, zone } = source.fetch_current().await?;

    if let Err(e) = state.store.insert_record(record.clone()).await {
        tracing::error!(source = source.name(), dt = record.dt, error = %e, "Failed to store observation");
        return Err(e);
    }

    if !zone.is_empty() {
        state.set_zone(&zone);
        if let Err(e) = persist_zone_if_absent(&state.config.zone_path, &zone).await {
            tracing::warn!(path = %state.config.zone_path.display(), error = %e, "Failed to persist zone");
        }
    }

    state.invalidator.on_ingested(&record);
    tracing::info!(source = source.name(), dt = record.dt, temp = record.temp, "Ingested observation");
    Ok(record)
}

// ============================================================================
// OPENWEATHERMAP
// ============================================================================

/// Settings for [`OpenWeatherMapSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct OwmConfig {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: String,
    pub lang: String,
    pub base_url: String,
    pub timeout: Duration,
}

fn required_coordinate(name: &str) -> Result<f64, ConfigError> {
    let raw = std::env::var(name).map_err(|_| ConfigError::MissingRequired {
        field: name.to_string(),
    })?;
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        value: raw.clone(),
        reason: "expected a decimal coordinate".to_string(),
    })
}

impl OwmConfig {
    pub fn new(api_key: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            api_key: api_key.into(),
            latitude,
            longitude,
            units: DEFAULT_OWM_UNITS.to_string(),
            lang: DEFAULT_OWM_LANG.to_string(),
            base_url: DEFAULT_OWM_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_OWM_TIMEOUT_SECS),
        }
    }

    /// Load from `OWM_API_KEY`, `OWM_LATITUDE`, `OWM_LONGITUDE`, `OWM_UNITS`
    /// and `OWM_LANG`.
    ///
    /// Returns `Ok(None)` when no API key is set; coordinates are required
    /// once a key is present.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = std::env::var("OWM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };

        let mut config = Self::new(
            api_key.trim(),
            required_coordinate("OWM_LATITUDE")?,
            required_coordinate("OWM_LONGITUDE")?,
        );
        if let Ok(units) = std::env::var("OWM_UNITS") {
            config.units = units;
        }
        if let Ok(lang) = std::env::var("OWM_LANG") {
            config.lang = lang;
        }
        Ok(Some(config))
    }
}

/// Current weather from the OpenWeatherMap API.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapSource {
    client: reqwest::Client,
    config: OwmConfig,
}

impl OpenWeatherMapSource {
    pub fn new(config: OwmConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IngestError::RequestFailed {
                source_name: "openweathermap".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    fn error(&self, reason: impl ToString) -> IngestError {
        IngestError::RequestFailed {
            source_name: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ObservationSource for OpenWeatherMapSource {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn fetch_current(&self) -> Result<Observation, IngestError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("lat", self.config.latitude.to_string()),
                ("lon", self.config.longitude.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", self.config.units.clone()),
                ("lang", self.config.lang.clone()),
            ])
            .send()
            .await
            .map_err(|e| self.error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::BadStatus {
                source_name: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.error(e))?;
        parse_current_weather(&body).map_err(|e| IngestError::InvalidResponse {
            source_name: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}

// Upstream payload, only the fields that are stored.

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    dt: i64,
    #[serde(default)]
    visibility: i64,
    #[serde(default)]
    name: String,
    sys: Sys,
    main: Main,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    clouds: Clouds,
    #[serde(default)]
    rain: Precipitation,
    #[serde(default)]
    snow: Precipitation,
    #[serde(default)]
    weather: Vec<Weather>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    feels_like: f64,
    pressure: f64,
    #[serde(default)]
    sea_level: Option<f64>,
    #[serde(default)]
    grnd_level: Option<f64>,
    humidity: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Clouds {
    #[serde(default)]
    all: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Precipitation {
    #[serde(default, rename = "1h")]
    one_hour: f64,
}

#[derive(Debug, Deserialize)]
struct Weather {
    id: i64,
}

/// Map an OpenWeatherMap current-weather response onto an observation.
///
/// Missing sea and ground level readings fall back to the station pressure.
pub fn parse_current_weather(body: &str) -> Result<Observation, serde_json::Error> {
    let current: CurrentWeather = serde_json::from_str(body)?;
    let weather = current
        .weather
        .iter()
        .map(|w| w.id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let record = Record {
        dt: current.dt,
        visibility: current.visibility,
        sunrise: current.sys.sunrise,
        sunset: current.sys.sunset,
        temp: current.main.temp,
        temp_min: current.main.temp_min,
        temp_max: current.main.temp_max,
        feels_like: current.main.feels_like,
        pressure: current.main.pressure,
        sea_level: current.main.sea_level.unwrap_or(current.main.pressure),
        grnd_level: current.main.grnd_level.unwrap_or(current.main.pressure),
        humidity: current.main.humidity,
        wind_speed: current.wind.speed,
        wind_deg: current.wind.deg,
        clouds_all: current.clouds.all,
        rain_1h: current.rain.one_hour,
        snow_1h: current.snow.one_hour,
        weather,
    };

    Ok(Observation {
        record,
        zone: current.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "coord": {"lon": 11.34, "lat": 44.49},
        "weather": [
            {"id": 500, "main": "Rain", "description": "pioggia leggera", "icon": "10d"},
            {"id": 701, "main": "Mist", "description": "foschia", "icon": "50d"}
        ],
        "base": "stations",
        "main": {
            "temp": 14.2, "feels_like": 13.6, "temp_min": 12.9, "temp_max": 15.1,
            "pressure": 1012, "humidity": 81, "sea_level": 1012, "grnd_level": 1003
        },
        "visibility": 8000,
        "wind": {"speed": 3.6, "deg": 250},
        "rain": {"1h": 0.42},
        "clouds": {"all": 75},
        "dt": 1700000000,
        "sys": {"type": 2, "id": 2004688, "country": "IT", "sunrise": 1699941000, "sunset": 1699976000},
        "timezone": 3600,
        "id": 3181928,
        "name": "Bologna",
        "cod": 200
    }"#;

    #[test]
    fn test_parse_full_payload() {
        let obs = parse_current_weather(SAMPLE).unwrap();
        assert_eq!(obs.zone, "Bologna");
        let r = &obs.record;
        assert_eq!(r.dt, 1_700_000_000);
        assert_eq!(r.visibility, 8000);
        assert_eq!(r.humidity, 81);
        assert_eq!(r.grnd_level, 1003.0);
        assert_eq!(r.rain_1h, 0.42);
        assert_eq!(r.snow_1h, 0.0);
        assert_eq!(r.clouds_all, 75);
        assert_eq!(r.wind_deg, 250.0);
        assert_eq!(r.weather, "500,701");
    }

    #[test]
    fn test_parse_missing_optional_blocks() {
        let body = r#"{
            "dt": 10,
            "sys": {},
            "main": {"temp": 1.0, "feels_like": 0.5, "temp_min": 0.0, "temp_max": 2.0,
                     "pressure": 990, "humidity": 50}
        }"#;
        let obs = parse_current_weather(body).unwrap();
        assert_eq!(obs.zone, "");
        assert_eq!(obs.record.sea_level, 990.0);
        assert_eq!(obs.record.grnd_level, 990.0);
        assert_eq!(obs.record.weather, "");
        assert_eq!(obs.record.wind_speed, 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_current_weather("{\"cod\": 401}").is_err());
    }

    #[test]
    fn test_owm_config_defaults() {
        let config = OwmConfig::new("key", 44.49, 11.34);
        assert_eq!(config.units, "metric");
        assert_eq!(config.lang, "it");
        assert!(config.base_url.starts_with("https://"));
    }
}
