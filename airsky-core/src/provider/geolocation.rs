use async_trait::async_trait;

use crate::{error::WeatherError, model::Coordinates};

use super::Geolocator;

/// Position supplied up front (CLI flags, environment); fails as unavailable
/// when none was given.
#[derive(Debug, Clone, Default)]
pub struct FixedPosition {
    position: Option<Coordinates>,
}

impl FixedPosition {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        self.position
            .ok_or_else(|| WeatherError::PositionUnavailable("no position configured".into()))
    }
}
