//! One-shot geolocation.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, error::LocationError, model::Coordinate};

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Reports the `home` coordinate from config.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredGeolocator {
    home: Option<Coordinate>,
    allowed: bool,
}

impl ConfiguredGeolocator {
    pub fn new(home: Option<Coordinate>, allowed: bool) -> Self {
        Self { home, allowed }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.home, config.allow_geolocation)
    }
}

#[async_trait]
impl Geolocator for ConfiguredGeolocator {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        if !self.allowed {
            return Err(LocationError::PermissionDenied);
        }
        self.home.ok_or(LocationError::Unavailable)
    }
}
