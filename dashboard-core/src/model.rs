use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const LOADING: &str = "Loading...";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const LOCATION_UNAVAILABLE: &str = "Location Unavailable";
pub const LOCATION_NOT_FOUND: &str = "Location not found";
pub const PLACEHOLDER_TIME: &str = "--:-- --";

/// Number of hourly entries requested from the forecast service.
pub const FORECAST_ENTRIES: usize = 6;

/// A WGS84 position. Captured once per aggregation cycle and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the coordinate lies inside the valid latitude/longitude ranges.
    ///
    /// The aggregator does not check this; passing an invalid coordinate is a
    /// caller bug.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Live reading from the current-conditions service, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition_label: String,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub wind_degrees: u16,
    pub cloudiness_pct: u8,
    pub precipitation_mm: f64,
    pub pressure_hpa: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise_local: String,
    pub sunset_local: String,
}

impl Default for SunTimes {
    fn default() -> Self {
        Self {
            sunrise_local: PLACEHOLDER_TIME.to_string(),
            sunset_local: PLACEHOLDER_TIME.to_string(),
        }
    }
}

impl SunTimes {
    /// Render UTC sunrise/sunset instants on the 12-hour clock of `tz`.
    pub fn from_utc<Tz>(sunrise: DateTime<Utc>, sunset: DateTime<Utc>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            sunrise_local: format_clock(sunrise, tz),
            sunset_local: format_clock(sunset, tz),
        }
    }
}

/// `6:04 AM` style clock time.
pub fn format_clock<Tz>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    instant.with_timezone(tz).format("%-I:%M %p").to_string()
}

/// `3 PM` style hour label used for forecast entries.
pub fn format_hour<Tz>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    instant.with_timezone(tz).format("%-I %p").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionIcon {
    Clear,
    Rain,
    Clouds,
    Thunderstorm,
    Other,
}

impl ConditionIcon {
    /// Map a provider condition label (`"Rain"`, `"clouds"`, ...) to an icon key.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "rain" => Self::Rain,
            "clouds" => Self::Clouds,
            "thunderstorm" => Self::Thunderstorm,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Clouds => "clouds",
            Self::Thunderstorm => "thunderstorm",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastEntry {
    pub time_label: String,
    pub temperature_c: i32,
    pub condition_icon: ConditionIcon,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prediction {
    pub temperature_c: Option<f64>,
    pub condition_label: Option<String>,
    pub confidence: Option<f64>,
}

/// Prediction slice of the view. It has one more state than [`Slice`]
/// because the lookup may never be issued at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PredictionSlice {
    /// Not issued in this cycle (yet, or ever if current conditions failed).
    #[default]
    Absent,
    Predicting,
    Ready(Prediction),
    Unavailable,
}

impl PredictionSlice {
    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Self::Ready(p) => Some(p),
            _ => None,
        }
    }
}

/// Per-lookup view slice: pending until its lookup settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Slice<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T> Slice<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

/// Everything the dashboard shows for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Token of the cycle that owns this state.
    pub generation: u64,
    pub coordinate: Option<Coordinate>,
    pub phase: Phase,
    pub loading: bool,
    /// True until the first cycle settles; drives the full-page spinner.
    pub initial_load: bool,
    pub error: Option<String>,
    pub place: Slice<String>,
    pub current: Slice<CurrentConditions>,
    pub sun: Slice<SunTimes>,
    pub forecast: Slice<Vec<HourlyForecastEntry>>,
    pub prediction: PredictionSlice,
    pub map_picker_open: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            generation: 0,
            coordinate: None,
            phase: Phase::Idle,
            loading: false,
            initial_load: true,
            error: None,
            place: Slice::Pending,
            current: Slice::Pending,
            sun: Slice::Pending,
            forecast: Slice::Pending,
            prediction: PredictionSlice::Absent,
            map_picker_open: false,
        }
    }
}

impl ViewState {
    /// Fresh state for a new cycle. Only the spinner flag and the map picker
    /// surface carry over from `previous`.
    pub fn begin_cycle(previous: &ViewState, generation: u64, coordinate: Coordinate) -> Self {
        Self {
            generation,
            coordinate: Some(coordinate),
            phase: Phase::Loading,
            loading: true,
            initial_load: previous.initial_load,
            map_picker_open: previous.map_picker_open,
            ..Self::default()
        }
    }

    pub fn place_label(&self) -> &str {
        match &self.place {
            Slice::Pending => LOADING,
            Slice::Ready(name) => name,
            Slice::Failed(_) => LOCATION_UNAVAILABLE,
        }
    }

    pub fn sun_times(&self) -> SunTimes {
        self.sun.ready().cloned().unwrap_or_default()
    }

    /// Full-page spinner only on the very first load.
    pub fn shows_full_page_spinner(&self) -> bool {
        self.loading && self.initial_load
    }
}
