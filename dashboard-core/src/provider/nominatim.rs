//! Reverse and forward geocoding against Nominatim (OpenStreetMap).
//! Free, no API key, but a descriptive User-Agent is required.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::LookupError,
    model::{Coordinate, UNKNOWN_LOCATION},
};

use super::{GeocodeMatch, Geocoder, Lookup, fetch_json, join_url};

const SEARCH_LIMIT: &str = "5";

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            http,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl NominatimAddress {
    /// city > town > village > county > state, then "Unknown Location".
    fn place_name(self) -> String {
        [self.city, self.town, self.village, self.county, self.state]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    address: Option<NominatimAddress>,
    error: Option<String>,
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl TryFrom<NominatimPlace> for GeocodeMatch {
    type Error = LookupError;

    fn try_from(place: NominatimPlace) -> Result<Self, Self::Error> {
        let parse = |raw: &str| {
            raw.trim().parse::<f64>().map_err(|e| {
                LookupError::malformed(Lookup::Search, format!("bad coordinate '{raw}': {e}"))
            })
        };

        Ok(GeocodeMatch {
            coordinate: Coordinate::new(parse(&place.lat)?, parse(&place.lon)?),
            display_name: place.display_name,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, LookupError> {
        let request = self.http.get(join_url(&self.base_url, "reverse")).query(&[
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ]);

        let body: NominatimReverse = fetch_json(Lookup::PlaceName, request).await?;

        if let Some(reason) = body.error {
            return Err(LookupError::Rejected {
                lookup: Lookup::PlaceName,
                reason,
            });
        }

        let name = body.address.unwrap_or_default().place_name();
        tracing::debug!(%coordinate, %name, "reverse geocoded");
        Ok(name)
    }

    async fn forward_geocode(&self, query: &str) -> Result<Vec<GeocodeMatch>, LookupError> {
        let request = self.http.get(join_url(&self.base_url, "search")).query(&[
            ("q", query),
            ("format", "json"),
            ("limit", SEARCH_LIMIT),
        ]);

        let places: Vec<NominatimPlace> = fetch_json(Lookup::Search, request).await?;
        places.into_iter().map(GeocodeMatch::try_from).collect()
    }
}
