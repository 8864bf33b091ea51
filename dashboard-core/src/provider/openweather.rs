use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{error::LookupError, model::{Coordinate, CurrentConditions}};

use super::{ConditionsProvider, ForecastPoint, ForecastProvider, Lookup, fetch_json, join_url};

/// Current conditions and the short hourly forecast, metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: &str, api_key: String, http: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key,
            http,
        }
    }

    fn query(&self, coordinate: Coordinate) -> [(&'static str, String); 4] {
        [
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwRain {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    rain: Option<OwRain>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn condition_of(weather: &[OwWeather]) -> String {
    weather
        .first()
        .map(|w| w.main.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

impl From<OwCurrentResponse> for CurrentConditions {
    fn from(parsed: OwCurrentResponse) -> Self {
        CurrentConditions {
            temperature_c: parsed.main.temp,
            condition_label: condition_of(&parsed.weather),
            humidity_pct: percent(parsed.main.humidity),
            wind_speed_ms: parsed.wind.speed,
            wind_degrees: (parsed.wind.deg.round().rem_euclid(360.0)) as u16,
            cloudiness_pct: percent(parsed.clouds.all),
            precipitation_mm: parsed.rain.map(|r| r.one_hour).unwrap_or(0.0),
            pressure_hpa: parsed.main.pressure,
        }
    }
}

#[async_trait]
impl ConditionsProvider for OpenWeatherProvider {
    async fn current_conditions(
        &self,
        coordinate: Coordinate,
    ) -> Result<CurrentConditions, LookupError> {
        let request = self
            .http
            .get(join_url(&self.base_url, "data/2.5/weather"))
            .query(&self.query(coordinate));

        let parsed: OwCurrentResponse = fetch_json(Lookup::CurrentConditions, request).await?;
        Ok(parsed.into())
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn forecast(
        &self,
        coordinate: Coordinate,
        count: usize,
    ) -> Result<Vec<ForecastPoint>, LookupError> {
        let request = self
            .http
            .get(join_url(&self.base_url, "data/2.5/forecast"))
            .query(&self.query(coordinate))
            .query(&[("cnt", count.to_string())]);

        let parsed: OwForecastResponse = fetch_json(Lookup::Forecast, request).await?;

        let mut points = parsed
            .list
            .into_iter()
            .map(|entry| {
                let timestamp = DateTime::<Utc>::from_timestamp(entry.dt, 0).ok_or_else(|| {
                    LookupError::malformed(
                        Lookup::Forecast,
                        format!("timestamp {} out of range", entry.dt),
                    )
                })?;
                Ok(ForecastPoint {
                    timestamp,
                    temperature_c: entry.main.temp,
                    condition_label: condition_of(&entry.weather),
                })
            })
            .collect::<Result<Vec<_>, LookupError>>()?;

        points.sort_by_key(|p| p.timestamp);
        points.truncate(count);
        Ok(points)
    }
}
