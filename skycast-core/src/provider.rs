use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::{CurrentWeather, ForecastEntry, GeoCoordinate};

pub mod openweather;

/// Weather API seam.
///
/// Both calls are parameterized by the same resolved coordinate and are
/// independent of each other; the pipeline issues them concurrently.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    /// Current conditions at the coordinate.
    async fn fetch_current(&self, coord: GeoCoordinate) -> anyhow::Result<CurrentWeather>;

    /// Raw 3-hourly forecast list at the coordinate, chronological order.
    async fn fetch_forecast(&self, coord: GeoCoordinate) -> anyhow::Result<Vec<ForecastEntry>>;
}
