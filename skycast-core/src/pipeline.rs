//! The weather fetch pipeline: permission, position fix, paired fetches,
//! data shaping. One run produces exactly one terminal state.

use chrono::{NaiveDateTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::location::{LocationError, LocationProvider, Permission};
use crate::model::{CurrentWeather, ForecastEntry, PipelineState};
use crate::provider::WeatherApi;

const POSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Keep only the entries that represent midday of their day, preserving the
/// feed's chronological order. A feed with no midday entries yields an empty
/// list, not an error.
pub fn daily_forecast(entries: Vec<ForecastEntry>) -> Vec<ForecastEntry> {
    entries.into_iter().filter(|e| is_midday(e.timestamp)).collect()
}

fn is_midday(ts: NaiveDateTime) -> bool {
    ts.hour() == 12 && ts.minute() == 0 && ts.second() == 0
}

/// English long weekday name for a forecast timestamp, for display.
pub fn weekday_name(timestamp: NaiveDateTime) -> String {
    timestamp.format("%A").to_string()
}

/// Coordinates one fetch-and-shape run against the injected location and
/// weather seams.
#[derive(Debug)]
pub struct Pipeline<L, W> {
    location: L,
    weather: W,
    position_timeout: Duration,
}

impl<L, W> Pipeline<L, W>
where
    L: LocationProvider,
    W: WeatherApi,
{
    pub fn new(location: L, weather: W) -> Self {
        Self { location, weather, position_timeout: POSITION_TIMEOUT }
    }

    pub fn with_position_timeout(mut self, position_timeout: Duration) -> Self {
        self.position_timeout = position_timeout;
        self
    }

    /// Run the pipeline once. Every failure is converted into a terminal
    /// `Failed` state here; nothing propagates to the render layer.
    pub async fn run(&self) -> PipelineState {
        match self.try_run().await {
            Ok((current, daily)) => PipelineState::Ready { current, daily },
            Err(err) => {
                warn!(error = %err, "weather pipeline run failed");
                PipelineState::Failed { message: err.user_message().to_string() }
            }
        }
    }

    async fn try_run(&self) -> Result<(CurrentWeather, Vec<ForecastEntry>), PipelineError> {
        debug!("requesting location permission");
        match self.location.request_permission().await {
            Permission::Granted => {}
            Permission::Denied => return Err(PipelineError::PermissionDenied),
        }

        let coord = timeout(self.position_timeout, self.location.current_position())
            .await
            .map_err(|_| PipelineError::Location(LocationError::Timeout))??;

        info!(lat = coord.latitude, lon = coord.longitude, "resolved position");

        // Both fetches depend only on the coordinate; issue them together and
        // wait for both. Either failure fails the run, no partial data.
        let (current, forecast) = tokio::try_join!(
            self.weather.fetch_current(coord),
            self.weather.fetch_forecast(coord),
        )
        .map_err(PipelineError::Fetch)?;

        info!(location = %current.location_name, "weather fetch complete");

        Ok((current, daily_forecast(forecast)))
    }
}

/// Single-writer state container between the pipeline and its observers.
///
/// The spawned run task is the only writer; observers read the latest state
/// or await changes through a `watch` receiver. Dropping the feed aborts an
/// in-flight run, so an abandoned run never publishes its result.
#[derive(Debug)]
pub struct WeatherFeed<L, W> {
    pipeline: Arc<Pipeline<L, W>>,
    tx: watch::Sender<PipelineState>,
    task: Option<JoinHandle<()>>,
}

impl<L, W> WeatherFeed<L, W>
where
    L: LocationProvider + 'static,
    W: WeatherApi + 'static,
{
    /// Publish `Loading` and start the first run.
    pub fn start(pipeline: Pipeline<L, W>) -> Self {
        let (tx, _) = watch::channel(PipelineState::Loading);
        let mut feed = Self { pipeline: Arc::new(pipeline), tx, task: None };
        feed.refresh();
        feed
    }

    /// Abort any in-flight run and start a brand-new one, overwriting prior
    /// state with `Loading`.
    pub fn refresh(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.tx.send_replace(PipelineState::Loading);

        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let state = pipeline.run().await;
            tx.send_replace(state);
        }));
    }

    /// Latest published state.
    pub fn state(&self) -> PipelineState {
        self.tx.borrow().clone()
    }

    /// Read-only observer handle.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.tx.subscribe()
    }
}

impl<L, W> Drop for WeatherFeed<L, W> {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FETCH_FAILED_MSG, PERMISSION_DENIED_MSG};
    use crate::model::GeoCoordinate;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counters {
        position: AtomicUsize,
        current: AtomicUsize,
        forecast: AtomicUsize,
    }

    #[derive(Debug)]
    struct MockLocation {
        permission: Permission,
        position: Option<GeoCoordinate>,
        hang: bool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl LocationProvider for MockLocation {
        async fn request_permission(&self) -> Permission {
            self.permission
        }

        async fn current_position(&self) -> Result<GeoCoordinate, LocationError> {
            self.counters.position.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.position
                .ok_or_else(|| LocationError::Unavailable("no fix".to_string()))
        }
    }

    #[derive(Debug)]
    struct MockWeather {
        current: Option<CurrentWeather>,
        forecast: Option<Vec<ForecastEntry>>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl WeatherApi for MockWeather {
        async fn fetch_current(&self, _coord: GeoCoordinate) -> anyhow::Result<CurrentWeather> {
            self.counters.current.fetch_add(1, Ordering::SeqCst);
            self.current.clone().ok_or_else(|| anyhow!("current endpoint down"))
        }

        async fn fetch_forecast(&self, _coord: GeoCoordinate) -> anyhow::Result<Vec<ForecastEntry>> {
            self.counters.forecast.fetch_add(1, Ordering::SeqCst);
            self.forecast.clone().ok_or_else(|| anyhow!("forecast endpoint down"))
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("test timestamp")
    }

    fn sample_current() -> CurrentWeather {
        CurrentWeather {
            location_name: "Chennai".to_string(),
            temperature_c: 31.4,
            temperature_min_c: 29.0,
            temperature_max_c: 33.1,
            humidity_pct: 70,
            condition: "Clouds".to_string(),
            condition_detail: "scattered clouds".to_string(),
            icon: "03d".to_string(),
            wind_speed_mps: 4.2,
        }
    }

    /// `count` entries at 3-hour resolution starting from `start`.
    fn three_hourly(start: &str, count: usize) -> Vec<ForecastEntry> {
        let start = ts(start);
        (0..count)
            .map(|i| {
                let timestamp = start + chrono::Duration::hours(3 * i as i64);
                ForecastEntry {
                    timestamp,
                    temperature_c: 25.0 + i as f64 * 0.1,
                    temperature_min_c: 24.0,
                    temperature_max_c: 32.0,
                    condition: "Clear".to_string(),
                    icon: "01d".to_string(),
                }
            })
            .collect()
    }

    fn pipeline_with(
        permission: Permission,
        position: Option<GeoCoordinate>,
        current: Option<CurrentWeather>,
        forecast: Option<Vec<ForecastEntry>>,
        counters: Arc<Counters>,
    ) -> Pipeline<MockLocation, MockWeather> {
        Pipeline::new(
            MockLocation { permission, position, hang: false, counters: Arc::clone(&counters) },
            MockWeather { current, forecast, counters },
        )
    }

    #[tokio::test]
    async fn denied_permission_fails_without_any_calls() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Denied,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            Some(three_hourly("2025-08-06 00:00:00", 40)),
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;

        assert_eq!(state, PipelineState::Failed { message: PERMISSION_DENIED_MSG.to_string() });
        assert_eq!(counters.position.load(Ordering::SeqCst), 0);
        assert_eq!(counters.current.load(Ordering::SeqCst), 0);
        assert_eq!(counters.forecast.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn position_failure_fails_without_fetches() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Granted,
            None,
            Some(sample_current()),
            Some(three_hourly("2025-08-06 00:00:00", 40)),
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;

        assert_eq!(state, PipelineState::Failed { message: FETCH_FAILED_MSG.to_string() });
        assert_eq!(counters.current.load(Ordering::SeqCst), 0);
        assert_eq!(counters.forecast.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn position_timeout_fails_the_run() {
        let counters = Arc::new(Counters::default());
        let location = MockLocation {
            permission: Permission::Granted,
            position: Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            hang: true,
            counters: Arc::clone(&counters),
        };
        let weather = MockWeather {
            current: Some(sample_current()),
            forecast: Some(three_hourly("2025-08-06 00:00:00", 40)),
            counters: Arc::clone(&counters),
        };
        let pipeline = Pipeline::new(location, weather)
            .with_position_timeout(Duration::from_millis(20));

        let state = pipeline.run().await;

        assert_eq!(state, PipelineState::Failed { message: FETCH_FAILED_MSG.to_string() });
        assert_eq!(counters.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forecast_failure_discards_current_weather() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            None,
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;
        assert_eq!(state, PipelineState::Failed { message: FETCH_FAILED_MSG.to_string() });
    }

    #[tokio::test]
    async fn current_failure_discards_forecast() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            None,
            Some(three_hourly("2025-08-06 00:00:00", 40)),
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;
        assert_eq!(state, PipelineState::Failed { message: FETCH_FAILED_MSG.to_string() });
    }

    #[tokio::test]
    async fn successful_run_yields_five_midday_days() {
        let counters = Arc::new(Counters::default());
        let forecast = three_hourly("2025-08-06 00:00:00", 40);
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            Some(forecast.clone()),
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;

        let PipelineState::Ready { current, daily } = state else {
            panic!("expected Ready, got {state:?}");
        };

        assert_eq!(current, sample_current());
        assert_eq!(daily.len(), 5);
        for (i, entry) in daily.iter().enumerate() {
            assert_eq!(entry.timestamp.hour(), 12);
            let expected_day = ts("2025-08-06 12:00:00") + chrono::Duration::days(i as i64);
            assert_eq!(entry.timestamp, expected_day);
        }
        assert_eq!(daily, daily_forecast(forecast));
        assert_eq!(counters.current.load(Ordering::SeqCst), 1);
        assert_eq!(counters.forecast.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn feed_without_midday_entries_is_ready_and_empty() {
        let counters = Arc::new(Counters::default());
        // Entries at 01:00 + 3h steps never hit 12:00:00.
        let forecast = three_hourly("2025-08-06 01:00:00", 8);
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            Some(forecast),
            Arc::clone(&counters),
        );

        let state = pipeline.run().await;

        let PipelineState::Ready { daily, .. } = state else {
            panic!("expected Ready, got {state:?}");
        };
        assert!(daily.is_empty());
    }

    #[test]
    fn daily_forecast_keeps_midday_in_order() {
        let entries = three_hourly("2025-08-06 00:00:00", 16);
        let daily = daily_forecast(entries);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].timestamp, ts("2025-08-06 12:00:00"));
        assert_eq!(daily[1].timestamp, ts("2025-08-07 12:00:00"));
    }

    #[test]
    fn daily_forecast_of_empty_feed_is_empty() {
        assert!(daily_forecast(Vec::new()).is_empty());
    }

    #[test]
    fn weekday_names_match_the_calendar() {
        assert_eq!(weekday_name(ts("2025-08-06 12:00:00")), "Wednesday");
        assert_eq!(weekday_name(ts("2026-01-01 12:00:00")), "Thursday");
        assert_eq!(weekday_name(ts("2026-08-09 12:00:00")), "Sunday");
    }

    #[tokio::test]
    async fn feed_publishes_loading_then_terminal_state() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            Some(three_hourly("2025-08-06 00:00:00", 40)),
            counters,
        );

        let feed = WeatherFeed::start(pipeline);
        let mut rx = feed.subscribe();

        let state = rx
            .wait_for(PipelineState::is_terminal)
            .await
            .expect("feed dropped before terminal state")
            .clone();

        assert!(matches!(state, PipelineState::Ready { .. }));
        assert_eq!(feed.state(), state);
    }

    #[tokio::test]
    async fn refresh_starts_a_new_run() {
        let counters = Arc::new(Counters::default());
        let pipeline = pipeline_with(
            Permission::Granted,
            Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            Some(sample_current()),
            Some(three_hourly("2025-08-06 00:00:00", 40)),
            Arc::clone(&counters),
        );

        let mut feed = WeatherFeed::start(pipeline);
        let mut rx = feed.subscribe();
        rx.wait_for(PipelineState::is_terminal).await.expect("first run");

        feed.refresh();
        rx.wait_for(PipelineState::is_terminal).await.expect("second run");

        assert_eq!(counters.current.load(Ordering::SeqCst), 2);
        assert_eq!(counters.forecast.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_feed_never_publishes_a_result() {
        let counters = Arc::new(Counters::default());
        let location = MockLocation {
            permission: Permission::Granted,
            position: Some(GeoCoordinate { latitude: 13.0, longitude: 80.2 }),
            hang: true,
            counters: Arc::clone(&counters),
        };
        let weather = MockWeather {
            current: Some(sample_current()),
            forecast: Some(three_hourly("2025-08-06 00:00:00", 40)),
            counters: Arc::clone(&counters),
        };

        let feed = WeatherFeed::start(Pipeline::new(location, weather));
        let mut rx = feed.subscribe();
        drop(feed);

        // The writer is gone; the last observed state is still Loading.
        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), PipelineState::Loading);
    }
}
