use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::location::{LocationError, LocationProvider, Permission};
use crate::model::GeoCoordinate;

const DEFAULT_ENDPOINT: &str = "https://ipapi.co/json/";

/// Request-level bound; the pipeline additionally bounds the whole fix.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the machine's position from its public IP address.
///
/// This is the CLI stand-in for a device positioning service. Consent is
/// decided by the caller (config or interactive prompt) and injected here;
/// the provider itself never prompts.
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    consent: Permission,
    http: Client,
    endpoint: String,
}

impl IpLocationProvider {
    pub fn new(consent: Permission) -> Self {
        Self { consent, http: Client::new(), endpoint: DEFAULT_ENDPOINT.to_string() }
    }

    /// Override the geolocation endpoint. Used by tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: f64,
    longitude: f64,
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn request_permission(&self) -> Permission {
        self.consent
    }

    async fn current_position(&self) -> Result<GeoCoordinate, LocationError> {
        let res = self
            .http
            .get(&self.endpoint)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocationError::Timeout
                } else {
                    LocationError::Unavailable(format!("geolocation request failed: {e}"))
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "geolocation endpoint returned status {status}"
            )));
        }

        let parsed: IpApiResponse = res.json().await.map_err(|e| {
            LocationError::Unavailable(format!("failed to decode geolocation response: {e}"))
        })?;

        debug!(lat = parsed.latitude, lon = parsed.longitude, "resolved position from public IP");

        Ok(GeoCoordinate { latitude: parsed.latitude, longitude: parsed.longitude })
    }
}
