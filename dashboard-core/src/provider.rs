use crate::{
    Config,
    error::LookupError,
    history::PredictionRequest,
    model::{Coordinate, CurrentConditions, Prediction},
    provider::{
        nominatim::NominatimGeocoder, openweather::OpenWeatherProvider,
        prediction::PredictionClient, sunrise_sunset::SunriseSunsetProvider,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod nominatim;
pub mod openweather;
pub mod prediction;
pub mod sunrise_sunset;

pub use prediction::HealthStatus;

/// Identifies one external lookup, for errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    PlaceName,
    Search,
    CurrentConditions,
    SunTimes,
    Forecast,
    Prediction,
    PredictionHealth,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::PlaceName => "place name",
            Lookup::Search => "search",
            Lookup::CurrentConditions => "current conditions",
            Lookup::SunTimes => "sun times",
            Lookup::Forecast => "forecast",
            Lookup::Prediction => "prediction",
            Lookup::PredictionHealth => "prediction health",
        }
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked forward-geocoding match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Sunrise and sunset as reported by the service, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunEvents {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Raw forecast point before it is formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub condition_label: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Human-readable place name for a coordinate.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, LookupError>;

    /// Ranked matches for a free-text query, best first. May be empty.
    async fn forward_geocode(&self, query: &str) -> Result<Vec<GeocodeMatch>, LookupError>;
}

#[async_trait]
pub trait ConditionsProvider: Send + Sync + Debug {
    async fn current_conditions(
        &self,
        coordinate: Coordinate,
    ) -> Result<CurrentConditions, LookupError>;
}

#[async_trait]
pub trait SunTimesProvider: Send + Sync + Debug {
    async fn sun_times(&self, coordinate: Coordinate) -> Result<SunEvents, LookupError>;
}

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Up to `count` points in chronological order.
    async fn forecast(
        &self,
        coordinate: Coordinate,
        count: usize,
    ) -> Result<Vec<ForecastPoint>, LookupError>;
}

#[async_trait]
pub trait Predictor: Send + Sync + Debug {
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, LookupError>;

    async fn health(&self) -> Result<HealthStatus, LookupError>;
}

/// The five collaborators the dashboard talks to.
#[derive(Debug, Clone)]
pub struct Services {
    pub geocoder: Arc<dyn Geocoder>,
    pub conditions: Arc<dyn ConditionsProvider>,
    pub sun_times: Arc<dyn SunTimesProvider>,
    pub forecast: Arc<dyn ForecastProvider>,
    pub predictor: Arc<dyn Predictor>,
}

impl Services {
    /// Construct the HTTP-backed services from config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.openweather_api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `weather-dash configure` and enter your API key."
            )
        })?;

        let http = http_client(config.request_timeout(), &config.user_agent)?;
        let endpoints = &config.endpoints;

        let openweather = Arc::new(OpenWeatherProvider::new(
            &endpoints.openweather,
            api_key.to_owned(),
            http.clone(),
        ));

        Ok(Self {
            geocoder: Arc::new(NominatimGeocoder::new(&endpoints.geocoding, http.clone())),
            conditions: openweather.clone(),
            sun_times: Arc::new(SunriseSunsetProvider::new(&endpoints.sun_times, http.clone())),
            forecast: openweather,
            predictor: Arc::new(PredictionClient::new(&endpoints.prediction, http)),
        })
    }
}

pub(crate) fn http_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send `request`, require a 2xx status and decode the JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    lookup: Lookup,
    request: RequestBuilder,
) -> Result<T, LookupError> {
    let res = request
        .send()
        .await
        .map_err(|source| LookupError::Transport { lookup, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| LookupError::Transport { lookup, source })?;

    if !status.is_success() {
        return Err(LookupError::Status {
            lookup,
            status,
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| LookupError::malformed(lookup, e.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
