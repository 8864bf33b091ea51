use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{Config, error::LookupError, history::PredictionRequest, model::Prediction};

use super::{Lookup, Predictor, fetch_json, http_client, join_url};

/// Client for the short-horizon temperature model. The service itself is a
/// black box; only its JSON contract is relied on.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    base_url: String,
    http: Client,
}

impl PredictionClient {
    pub fn new(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            http,
        }
    }

    /// Standalone client, for health checks that need no other service.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client(config.request_timeout(), &config.user_agent)?;
        Ok(Self::new(&config.endpoints.prediction, http))
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predicted_temperature: f64,
    confidence: f64,
    #[serde(default)]
    condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_ready: bool,
}

impl TryFrom<PredictResponse> for Prediction {
    type Error = LookupError;

    fn try_from(res: PredictResponse) -> Result<Self, Self::Error> {
        if !res.predicted_temperature.is_finite() {
            return Err(LookupError::malformed(
                Lookup::Prediction,
                "predicted_temperature is not a finite number",
            ));
        }
        if !(0.0..=1.0).contains(&res.confidence) {
            return Err(LookupError::malformed(
                Lookup::Prediction,
                format!("confidence {} outside [0, 1]", res.confidence),
            ));
        }

        Ok(Prediction {
            temperature_c: Some(res.predicted_temperature),
            condition_label: res.condition,
            confidence: Some(res.confidence),
        })
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, LookupError> {
        let req = self
            .http
            .post(join_url(&self.base_url, "predict/"))
            .json(request);

        let res: PredictResponse = fetch_json(Lookup::Prediction, req).await?;
        Prediction::try_from(res)
    }

    async fn health(&self) -> Result<HealthStatus, LookupError> {
        let req = self.http.get(join_url(&self.base_url, "health"));
        fetch_json(Lookup::PredictionHealth, req).await
    }
}
