use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::GeoCoordinate;

pub mod ip;

/// Outcome of a foreground location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location service unavailable: {0}")]
    Unavailable(String),

    #[error("position fix timed out")]
    Timeout,
}

/// Positioning service seam.
///
/// A provider that cannot determine consent reports `Denied`; only a granted
/// permission lets the pipeline ask for a position fix.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn request_permission(&self) -> Permission;

    async fn current_position(&self) -> Result<GeoCoordinate, LocationError>;
}
