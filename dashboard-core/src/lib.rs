//! Core library for the `weather-dash` dashboard.
//!
//! This crate defines:
//! - The view-state model and its sentinels
//! - Clients for the geocoding, weather, sun-times and prediction services
//! - The aggregator that turns a coordinate into a populated view
//! - Session observation and configuration handling
//!
//! It is used by `dashboard-cli`, but any other front end can drive a
//! [`Dashboard`] the same way.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod location;
pub mod model;
pub mod provider;
pub mod session;

pub use config::{Config, Endpoints};
pub use dashboard::Dashboard;
pub use error::{DashboardError, LocationError, LookupError};
pub use location::{ConfiguredGeolocator, Geolocator};
pub use model::{
    ConditionIcon, Coordinate, CurrentConditions, HourlyForecastEntry, Phase, Prediction,
    PredictionSlice, Slice, SunTimes, ViewState,
};
pub use provider::{Lookup, Services};
pub use session::{AuthState, Identity, SessionHub, Subscription};
