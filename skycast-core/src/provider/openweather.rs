use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::model::{CurrentWeather, ForecastEntry, GeoCoordinate};

use super::WeatherApi;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timestamp format of the forecast feed's `dt_txt` field.
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Client for the OpenWeatherMap current-weather and 5-day forecast
/// endpoints. Units are fixed to metric.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherClient {
    /// An absent or invalid API key is not rejected here: the request goes
    /// out and the API's 401 surfaces as a fetch failure.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, endpoint: &str, coord: GeoCoordinate) -> Result<String> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({endpoint})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {endpoint} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                endpoint,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    #[serde(default)]
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn fetch_current(&self, coord: GeoCoordinate) -> Result<CurrentWeather> {
        let body = self.get_json("weather", coord).await?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        let (condition, condition_detail, icon) = parsed
            .weather
            .first()
            .map(|w| (w.main.clone(), w.description.clone(), w.icon.clone()))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new(), String::new()));

        debug!(location = %parsed.name, temp_c = parsed.main.temp, "fetched current weather");

        Ok(CurrentWeather {
            location_name: parsed.name,
            temperature_c: parsed.main.temp,
            temperature_min_c: parsed.main.temp_min,
            temperature_max_c: parsed.main.temp_max,
            humidity_pct: parsed.main.humidity,
            condition,
            condition_detail,
            icon,
            wind_speed_mps: parsed.wind.speed,
        })
    }

    async fn fetch_forecast(&self, coord: GeoCoordinate) -> Result<Vec<ForecastEntry>> {
        let body = self.get_json("forecast", coord).await?;

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather forecast JSON")?;

        debug!(entries = parsed.list.len(), "fetched forecast feed");

        parsed.list.into_iter().map(convert_entry).collect()
    }
}

fn convert_entry(entry: OwForecastEntry) -> Result<ForecastEntry> {
    let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT)
        .with_context(|| format!("Malformed forecast timestamp: {:?}", entry.dt_txt))?;

    let (condition, icon) = entry
        .weather
        .first()
        .map(|w| (w.main.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

    Ok(ForecastEntry {
        timestamp,
        temperature_c: entry.main.temp,
        temperature_min_c: entry.main.temp_min,
        temperature_max_c: entry.main.temp_max,
        condition,
        icon,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}
