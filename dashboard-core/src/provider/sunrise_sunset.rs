use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{error::LookupError, model::Coordinate};

use super::{Lookup, SunEvents, SunTimesProvider, fetch_json, join_url};

/// sunrise-sunset.org; with `formatted=0` it returns ISO 8601 UTC instants.
#[derive(Debug, Clone)]
pub struct SunriseSunsetProvider {
    base_url: String,
    http: Client,
}

impl SunriseSunsetProvider {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SsResults {
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SsResponse {
    status: String,
    // Absent or a bare string when status isn't OK.
    #[serde(default)]
    results: Option<serde_json::Value>,
}

#[async_trait]
impl SunTimesProvider for SunriseSunsetProvider {
    async fn sun_times(&self, coordinate: Coordinate) -> Result<SunEvents, LookupError> {
        let request = self.http.get(join_url(&self.base_url, "json")).query(&[
            ("lat", coordinate.latitude.to_string()),
            ("lng", coordinate.longitude.to_string()),
            ("formatted", "0".to_string()),
        ]);

        let body: SsResponse = fetch_json(Lookup::SunTimes, request).await?;
        parse_sun_events(body)
    }
}

fn parse_sun_events(body: SsResponse) -> Result<SunEvents, LookupError> {
    if body.status != "OK" {
        return Err(LookupError::Rejected {
            lookup: Lookup::SunTimes,
            reason: format!("status {}", body.status),
        });
    }

    let results = body
        .results
        .ok_or_else(|| LookupError::malformed(Lookup::SunTimes, "missing results"))?;
    let results: SsResults = serde_json::from_value(results)
        .map_err(|e| LookupError::malformed(Lookup::SunTimes, e.to_string()))?;

    Ok(SunEvents {
        sunrise: results.sunrise,
        sunset: results.sunset,
    })
}
