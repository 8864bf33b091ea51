//! Input series for the temperature prediction endpoint.
//!
//! The model consumes 144 samples at 10-minute spacing (one day). No real
//! history is fetched: the live reading is repeated across the whole window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::CurrentConditions;

pub const SEQUENCE_LEN: usize = 144;
pub const SAMPLE_SPACING_MINUTES: i64 = 10;

/// One row of the series, keyed the way the prediction service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    #[serde(rename = "Date_Time")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "p (mbar)")]
    pub pressure_mbar: f64,
    #[serde(rename = "T (degC)")]
    pub temperature_c: f64,
    #[serde(rename = "rh (%)")]
    pub relative_humidity_pct: f64,
    #[serde(rename = "wv (m/s)")]
    pub wind_speed_ms: f64,
    #[serde(rename = "Tdew (degC)", default, skip_serializing_if = "Option::is_none")]
    pub dew_point_c: Option<f64>,
    #[serde(rename = "VPmax (mbar)", default, skip_serializing_if = "Option::is_none")]
    pub vapour_pressure_max_mbar: Option<f64>,
    #[serde(rename = "VPact (mbar)", default, skip_serializing_if = "Option::is_none")]
    pub vapour_pressure_actual_mbar: Option<f64>,
    #[serde(rename = "VPdef (mbar)", default, skip_serializing_if = "Option::is_none")]
    pub vapour_pressure_deficit_mbar: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub weather_data: Vec<WeatherSample>,
}

impl WeatherSample {
    pub fn from_reading(
        date_time: DateTime<Utc>,
        pressure_mbar: f64,
        temperature_c: f64,
        relative_humidity_pct: f64,
        wind_speed_ms: f64,
    ) -> Self {
        let vp_max = saturation_vapour_pressure(temperature_c);
        let vp_act = vp_max * relative_humidity_pct / 100.0;

        Self {
            date_time,
            pressure_mbar,
            temperature_c,
            relative_humidity_pct,
            wind_speed_ms,
            dew_point_c: dew_point(temperature_c, relative_humidity_pct),
            vapour_pressure_max_mbar: finite(vp_max),
            vapour_pressure_actual_mbar: finite(vp_act),
            vapour_pressure_deficit_mbar: finite(vp_max - vp_act),
        }
    }
}

/// Build the 144-sample window ending at `now` from a single live reading.
pub fn synthesize_history(current: &CurrentConditions, now: DateTime<Utc>) -> PredictionRequest {
    let last = SEQUENCE_LEN as i64 - 1;
    let weather_data = (0..=last)
        .map(|i| {
            let at = now - Duration::minutes(SAMPLE_SPACING_MINUTES * (last - i));
            WeatherSample::from_reading(
                at,
                current.pressure_hpa,
                current.temperature_c,
                f64::from(current.humidity_pct),
                current.wind_speed_ms,
            )
        })
        .collect();

    PredictionRequest { weather_data }
}

/// Magnus formula, mbar.
pub fn saturation_vapour_pressure(temperature_c: f64) -> f64 {
    6.112 * ((17.67 * temperature_c) / (temperature_c + 243.5)).exp()
}

/// Dew point in °C; `None` when humidity is zero (log undefined).
pub fn dew_point(temperature_c: f64, relative_humidity_pct: f64) -> Option<f64> {
    if relative_humidity_pct <= 0.0 {
        return None;
    }
    let vp = saturation_vapour_pressure(temperature_c) * relative_humidity_pct / 100.0;
    let ln = (vp / 6.112).ln();
    finite((243.5 * ln) / (17.67 - ln))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
