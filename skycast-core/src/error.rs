use thiserror::Error;

use crate::location::LocationError;

/// Message shown when the user declines location access.
pub const PERMISSION_DENIED_MSG: &str = "Permission to access location was denied.";

/// Message shown for any location or network/API failure.
pub const FETCH_FAILED_MSG: &str = "Could not fetch weather data. Check your connection or API key.";

/// Everything that can end a pipeline run in `Failed`.
///
/// The taxonomy stays finer-grained than what the user sees: `Location` and
/// `Fetch` collapse into one message string at the state boundary, while logs
/// keep the distinction.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position fix failed: {0}")]
    Location(#[from] LocationError),

    #[error("weather fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),
}

impl PipelineError {
    /// Human-readable message for the render layer. No structured codes are
    /// exposed to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::PermissionDenied => PERMISSION_DENIED_MSG,
            PipelineError::Location(_) | PipelineError::Fetch(_) => FETCH_FAILED_MSG,
        }
    }
}
