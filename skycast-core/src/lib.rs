//! Core library for the `skycast` weather app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The location provider and weather API seams
//! - The fetch pipeline that turns a position fix and two API calls into a
//!   single tri-state result for a render layer
//!
//! It is used by `skycast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use config::Config;
pub use error::{FETCH_FAILED_MSG, PERMISSION_DENIED_MSG, PipelineError};
pub use location::{LocationError, LocationProvider, Permission, ip::IpLocationProvider};
pub use model::{CurrentWeather, ForecastEntry, GeoCoordinate, PipelineState};
pub use pipeline::{Pipeline, WeatherFeed, daily_forecast, weekday_name};
pub use provider::{WeatherApi, openweather::OpenWeatherClient};
