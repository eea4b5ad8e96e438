use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single resolved latitude/longitude pair from the positioning service.
///
/// Produced once per pipeline run and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions at the resolved location, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location_name: String,
    pub temperature_c: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub humidity_pct: u8,
    /// Short condition group, e.g. "Clouds".
    pub condition: String,
    /// Longer condition text, e.g. "scattered clouds".
    pub condition_detail: String,
    /// Provider icon code, e.g. "03d".
    pub icon: String,
    pub wind_speed_mps: f64,
}

/// One entry of the 3-hourly forecast feed.
///
/// The raw feed carries up to 40 of these over five days; the pipeline keeps
/// only the midday entry of each day for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: NaiveDateTime,
    pub temperature_c: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub condition: String,
    pub icon: String,
}

/// Result of one pipeline run as seen by the render layer.
///
/// Transitions are one-directional: `Loading` is the initial state and a run
/// ends in exactly one of `Failed` or `Ready`. A refresh starts a brand-new
/// run that overwrites prior state.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Loading,
    Failed {
        message: String,
    },
    Ready {
        current: CurrentWeather,
        daily: Vec<ForecastEntry>,
    },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineState::Loading)
    }
}
