//! Location & weather aggregation.
//!
//! A location-changing action starts a cycle: four lookups run concurrently
//! (place name, current conditions, sun times, forecast), and the prediction
//! lookup is chained behind current conditions because it needs that reading.
//! Every lookup writes only its own slice of the [`ViewState`], and only while
//! its cycle is still the newest one.

use chrono::{Local, TimeZone, Utc};
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tokio::sync::watch;

use crate::{
    Config,
    error::LookupError,
    history::synthesize_history,
    location::{ConfiguredGeolocator, Geolocator},
    model::{
        ConditionIcon, Coordinate, FORECAST_ENTRIES, HourlyForecastEntry, LOCATION_NOT_FOUND,
        LOCATION_UNAVAILABLE, Phase, PredictionSlice, Slice, SunTimes, ViewState, format_hour,
    },
    provider::{ForecastPoint, Lookup, Services},
};

#[derive(Debug)]
pub struct Dashboard {
    services: Services,
    geolocator: Arc<dyn Geolocator>,
    fallback: Coordinate,
    state: Mutex<Shared>,
    updates: watch::Sender<ViewState>,
}

#[derive(Debug, Default)]
struct Shared {
    view: ViewState,
    /// Bumped when a location-changing action is issued: a cycle start or a
    /// search. A search may only act on its result while it is the latest.
    latest_action: u64,
}

impl Dashboard {
    pub fn new(services: Services, geolocator: Arc<dyn Geolocator>, fallback: Coordinate) -> Self {
        let (updates, _) = watch::channel(ViewState::default());
        Self {
            services,
            geolocator,
            fallback,
            state: Mutex::new(Shared::default()),
            updates,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            Services::from_config(config)?,
            Arc::new(ConfiguredGeolocator::from_config(config)),
            config.fallback,
        ))
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.lock().view.clone()
    }

    /// Receives every intermediate state, e.g. place resolved before forecast.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.updates.subscribe()
    }

    pub fn open_map_picker(&self) {
        self.update(|vs| vs.map_picker_open = true);
    }

    /// Geolocate once and load that position, falling back to the configured
    /// coordinate when geolocation is denied or unavailable.
    pub async fn locate_and_fetch(&self) -> ViewState {
        let coordinate = match self.geolocator.current_position().await {
            Ok(coordinate) => coordinate,
            Err(err) => {
                tracing::warn!(error = %err, fallback = %self.fallback, "geolocation failed, using fallback");
                self.fallback
            }
        };
        self.resolve_and_fetch_all(coordinate).await
    }

    /// Run one aggregation cycle for `coordinate`.
    ///
    /// Never fails: each lookup's failure lands in its own slice. Returns the
    /// state once every launched lookup has settled. If a newer cycle started
    /// meanwhile, the returned state is that newer cycle's.
    pub async fn resolve_and_fetch_all(&self, coordinate: Coordinate) -> ViewState {
        let generation = self.begin_cycle(coordinate);
        self.run_cycle(generation, coordinate).await
    }

    /// Forward-geocode `query` and load the best match.
    ///
    /// Blank queries are ignored and return `None`. When nothing matches, only
    /// the error message changes. A reply that arrives after a newer search or
    /// cycle was issued is dropped.
    pub async fn search_by_text(&self, query: &str) -> Option<ViewState> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let ticket = self.issue_action();
        let best = match self.services.geocoder.forward_geocode(query).await {
            Ok(matches) => matches.into_iter().next(),
            Err(err) => {
                tracing::warn!(query, error = %err, "search failed");
                None
            }
        };

        let (generation, coordinate) = {
            let mut shared = self.state.lock();
            if shared.latest_action != ticket {
                tracing::debug!(query, ticket, latest = shared.latest_action, "dropping stale search result");
                return Some(shared.view.clone());
            }

            let Some(found) = best else {
                tracing::info!(query, "search found nothing");
                shared.view.error = Some(LOCATION_NOT_FOUND.to_string());
                self.updates.send_replace(shared.view.clone());
                return Some(shared.view.clone());
            };

            tracing::info!(query, place = %found.display_name, "search matched");
            (self.start_cycle(&mut shared, found.coordinate), found.coordinate)
        };

        Some(self.run_cycle(generation, coordinate).await)
    }

    /// Same as [`Self::resolve_and_fetch_all`], then closes the map picker
    /// regardless of how the lookups went.
    pub async fn select_from_map(&self, coordinate: Coordinate) -> ViewState {
        self.resolve_and_fetch_all(coordinate).await;
        self.update(|vs| vs.map_picker_open = false)
    }

    fn issue_action(&self) -> u64 {
        let mut shared = self.state.lock();
        shared.latest_action += 1;
        shared.latest_action
    }

    fn begin_cycle(&self, coordinate: Coordinate) -> u64 {
        let mut shared = self.state.lock();
        self.start_cycle(&mut shared, coordinate)
    }

    fn start_cycle(&self, shared: &mut Shared, coordinate: Coordinate) -> u64 {
        shared.latest_action += 1;
        let generation = shared.view.generation + 1;
        shared.view = ViewState::begin_cycle(&shared.view, generation, coordinate);
        self.updates.send_replace(shared.view.clone());
        generation
    }

    async fn run_cycle(&self, generation: u64, coordinate: Coordinate) -> ViewState {
        tracing::info!(generation, %coordinate, "aggregation cycle started");

        tokio::join!(
            self.fetch_place(generation, coordinate),
            self.fetch_current_then_predict(generation, coordinate),
            self.fetch_sun_times(generation, coordinate),
            self.fetch_forecast(generation, coordinate),
        );

        self.apply(generation, "cycle", |vs| {
            vs.loading = false;
            vs.initial_load = false;
            vs.phase = if vs.current.is_failed() {
                Phase::Errored
            } else {
                Phase::Ready
            };
        });
        tracing::info!(generation, "aggregation cycle settled");

        self.snapshot()
    }

    fn update(&self, f: impl FnOnce(&mut ViewState)) -> ViewState {
        let mut shared = self.state.lock();
        f(&mut shared.view);
        self.updates.send_replace(shared.view.clone());
        shared.view.clone()
    }

    /// Apply `f` only if `generation` is still the current cycle.
    fn apply(&self, generation: u64, what: &str, f: impl FnOnce(&mut ViewState)) -> bool {
        let mut shared = self.state.lock();
        if shared.view.generation != generation {
            tracing::debug!(generation, current = shared.view.generation, what, "dropping stale result");
            return false;
        }
        f(&mut shared.view);
        self.updates.send_replace(shared.view.clone());
        true
    }

    async fn fetch_place(&self, generation: u64, coordinate: Coordinate) {
        let slice = match self.services.geocoder.reverse_geocode(coordinate).await {
            Ok(name) => Slice::Ready(name),
            Err(err) => {
                log_failure(generation, &err);
                Slice::Failed(LOCATION_UNAVAILABLE.to_string())
            }
        };
        self.apply(generation, Lookup::PlaceName.as_str(), |vs| vs.place = slice);
    }

    async fn fetch_current_then_predict(&self, generation: u64, coordinate: Coordinate) {
        let current = match self.services.conditions.current_conditions(coordinate).await {
            Ok(current) => current,
            Err(err) => {
                log_failure(generation, &err);
                self.apply(generation, Lookup::CurrentConditions.as_str(), |vs| {
                    vs.current = Slice::Failed(err.to_string())
                });
                return;
            }
        };

        let request = synthesize_history(&current, Utc::now());
        let issued = self.apply(generation, Lookup::CurrentConditions.as_str(), |vs| {
            vs.current = Slice::Ready(current);
            vs.prediction = PredictionSlice::Predicting;
        });
        if !issued {
            return;
        }

        let slice = match self.services.predictor.predict(&request).await {
            Ok(prediction) => PredictionSlice::Ready(prediction),
            Err(err) => {
                log_failure(generation, &err);
                PredictionSlice::Unavailable
            }
        };
        self.apply(generation, Lookup::Prediction.as_str(), |vs| vs.prediction = slice);
    }

    async fn fetch_sun_times(&self, generation: u64, coordinate: Coordinate) {
        let slice = match self.services.sun_times.sun_times(coordinate).await {
            Ok(events) => Slice::Ready(SunTimes::from_utc(events.sunrise, events.sunset, &Local)),
            Err(err) => {
                log_failure(generation, &err);
                Slice::Failed(err.to_string())
            }
        };
        self.apply(generation, Lookup::SunTimes.as_str(), |vs| vs.sun = slice);
    }

    async fn fetch_forecast(&self, generation: u64, coordinate: Coordinate) {
        let slice = match self
            .services
            .forecast
            .forecast(coordinate, FORECAST_ENTRIES)
            .await
        {
            Ok(points) => Slice::Ready(forecast_entries(points, &Local)),
            Err(err) => {
                log_failure(generation, &err);
                Slice::Failed(err.to_string())
            }
        };
        self.apply(generation, Lookup::Forecast.as_str(), |vs| vs.forecast = slice);
    }
}

fn log_failure(generation: u64, err: &LookupError) {
    tracing::warn!(generation, lookup = %err.lookup(), error = %err, "lookup failed");
}

/// Chronological display entries, at most [`FORECAST_ENTRIES`].
pub fn forecast_entries<Tz>(mut points: Vec<ForecastPoint>, tz: &Tz) -> Vec<HourlyForecastEntry>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    points.sort_by_key(|p| p.timestamp);
    points
        .into_iter()
        .take(FORECAST_ENTRIES)
        .map(|p| HourlyForecastEntry {
            time_label: format_hour(p.timestamp, tz),
            temperature_c: p.temperature_c.round() as i32,
            condition_icon: ConditionIcon::from_label(&p.condition_label),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        history::{PredictionRequest, SEQUENCE_LEN},
        model::{CurrentConditions, Prediction},
        provider::{
            ConditionsProvider, ForecastProvider, GeocodeMatch, Geocoder, HealthStatus, Predictor,
            SunEvents, SunTimesProvider,
        },
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const OSLO: Coordinate = Coordinate::new(59.91, 10.75);
    const LIMA: Coordinate = Coordinate::new(-12.05, -77.04);

    fn failure(lookup: Lookup) -> LookupError {
        LookupError::Rejected {
            lookup,
            reason: "boom".into(),
        }
    }

    fn reading() -> CurrentConditions {
        CurrentConditions {
            temperature_c: 20.0,
            condition_label: "Clear".into(),
            humidity_pct: 50,
            wind_speed_ms: 3.0,
            wind_degrees: 90,
            cloudiness_pct: 10,
            precipitation_mm: 0.0,
            pressure_hpa: 1013.0,
        }
    }

    #[derive(Debug, Default)]
    struct FakeGeocoder {
        fail_reverse: bool,
        matches: Vec<GeocodeMatch>,
        searches: AtomicUsize,
        // Reverse lookups for `slow` (and every search when `slow_search` is
        // set) wait for `gate` after signalling `started`.
        slow: Option<Coordinate>,
        slow_search: bool,
        started: Arc<Notify>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, LookupError> {
            if self.slow == Some(coordinate) {
                self.started.notify_one();
                self.gate.notified().await;
                return Ok("Stale Town".into());
            }
            if self.fail_reverse {
                return Err(failure(Lookup::PlaceName));
            }
            Ok(format!("Place {:.0}", coordinate.latitude))
        }

        async fn forward_geocode(&self, _query: &str) -> Result<Vec<GeocodeMatch>, LookupError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.slow_search {
                self.started.notify_one();
                self.gate.notified().await;
            }
            Ok(self.matches.clone())
        }
    }

    #[derive(Debug)]
    struct FakeConditions {
        fail: bool,
    }

    #[async_trait]
    impl ConditionsProvider for FakeConditions {
        async fn current_conditions(&self, _: Coordinate) -> Result<CurrentConditions, LookupError> {
            if self.fail {
                Err(failure(Lookup::CurrentConditions))
            } else {
                Ok(reading())
            }
        }
    }

    #[derive(Debug)]
    struct FakeSun {
        fail: bool,
    }

    #[async_trait]
    impl SunTimesProvider for FakeSun {
        async fn sun_times(&self, _: Coordinate) -> Result<SunEvents, LookupError> {
            if self.fail {
                return Err(failure(Lookup::SunTimes));
            }
            Ok(SunEvents {
                sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 4, 5, 0).unwrap(),
                sunset: Utc.with_ymd_and_hms(2024, 6, 1, 19, 30, 0).unwrap(),
            })
        }
    }

    #[derive(Debug)]
    struct FakeForecast {
        fail: bool,
    }

    #[async_trait]
    impl ForecastProvider for FakeForecast {
        async fn forecast(&self, _: Coordinate, count: usize) -> Result<Vec<ForecastPoint>, LookupError> {
            if self.fail {
                return Err(failure(Lookup::Forecast));
            }
            let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
            Ok((0..count as i64)
                .map(|i| ForecastPoint {
                    timestamp: start + Duration::hours(3 * i),
                    temperature_c: 18.4 + i as f64,
                    condition_label: (if i % 2 == 0 { "Rain" } else { "Mist" }).to_string(),
                })
                .collect())
        }
    }

    #[derive(Debug, Default)]
    struct FakePredictor {
        fail: bool,
        calls: AtomicUsize,
        last: Mutex<Option<PredictionRequest>>,
    }

    #[async_trait]
    impl Predictor for FakePredictor {
        async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(request.clone());
            if self.fail {
                return Err(failure(Lookup::Prediction));
            }
            Ok(Prediction {
                temperature_c: Some(21.5),
                condition_label: None,
                confidence: Some(0.9),
            })
        }

        async fn health(&self) -> Result<HealthStatus, LookupError> {
            Ok(HealthStatus {
                status: "ready".into(),
                model_ready: true,
            })
        }
    }

    #[derive(Default)]
    struct Failures {
        place: bool,
        current: bool,
        sun: bool,
        forecast: bool,
        predict: bool,
    }

    fn dashboard_with(
        geocoder: FakeGeocoder,
        fails: Failures,
        geolocator: ConfiguredGeolocator,
    ) -> (Dashboard, Arc<FakePredictor>) {
        let predictor = Arc::new(FakePredictor {
            fail: fails.predict,
            ..FakePredictor::default()
        });
        let services = Services {
            geocoder: Arc::new(FakeGeocoder {
                fail_reverse: fails.place,
                ..geocoder
            }),
            conditions: Arc::new(FakeConditions { fail: fails.current }),
            sun_times: Arc::new(FakeSun { fail: fails.sun }),
            forecast: Arc::new(FakeForecast { fail: fails.forecast }),
            predictor: predictor.clone(),
        };
        let dash = Dashboard::new(services, Arc::new(geolocator), LIMA);
        (dash, predictor)
    }

    fn dashboard(fails: Failures) -> (Dashboard, Arc<FakePredictor>) {
        dashboard_with(
            FakeGeocoder::default(),
            fails,
            ConfiguredGeolocator::new(Some(OSLO), true),
        )
    }

    #[tokio::test]
    async fn full_cycle_populates_every_slice() {
        let (dash, predictor) = dashboard(Failures::default());
        let vs = dash.resolve_and_fetch_all(OSLO).await;

        assert!(!vs.loading);
        assert!(!vs.initial_load);
        assert_eq!(vs.phase, Phase::Ready);
        assert_eq!(vs.generation, 1);
        assert_eq!(vs.coordinate, Some(OSLO));
        assert_eq!(vs.place_label(), "Place 60");
        assert_eq!(vs.current.ready(), Some(&reading()));

        let sunrise = Utc.with_ymd_and_hms(2024, 6, 1, 4, 5, 0).unwrap();
        assert_eq!(vs.sun_times().sunrise_local, crate::model::format_clock(sunrise, &Local));

        let forecast = vs.forecast.ready().unwrap();
        assert_eq!(forecast.len(), FORECAST_ENTRIES);
        assert_eq!(forecast[0].temperature_c, 18);
        assert_eq!(forecast[0].condition_icon, ConditionIcon::Rain);
        assert_eq!(forecast[1].condition_icon, ConditionIcon::Other);

        let prediction = vs.prediction.prediction().unwrap();
        assert_eq!(prediction.temperature_c, Some(21.5));
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_current_conditions_never_issue_prediction() {
        let (dash, predictor) = dashboard(Failures {
            current: true,
            ..Failures::default()
        });
        let vs = dash.resolve_and_fetch_all(OSLO).await;

        assert!(!vs.loading);
        assert_eq!(vs.phase, Phase::Errored);
        assert!(vs.current.is_failed());
        assert_eq!(vs.prediction, PredictionSlice::Absent);
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
        // The independent lookups still landed.
        assert!(vs.place.ready().is_some());
        assert!(vs.forecast.ready().is_some());
    }

    #[tokio::test]
    async fn prediction_request_repeats_current_reading() {
        let before = Utc::now();
        let (dash, predictor) = dashboard(Failures::default());
        dash.resolve_and_fetch_all(OSLO).await;
        let after = Utc::now();

        let request = predictor.last.lock().clone().unwrap();
        assert_eq!(request.weather_data.len(), SEQUENCE_LEN);
        for sample in &request.weather_data {
            assert_eq!(sample.pressure_mbar, 1013.0);
            assert_eq!(sample.temperature_c, 20.0);
            assert_eq!(sample.relative_humidity_pct, 50.0);
            assert_eq!(sample.wind_speed_ms, 3.0);
        }
        for pair in request.weather_data.windows(2) {
            assert_eq!(pair[1].date_time - pair[0].date_time, Duration::minutes(10));
        }
        let last = request.weather_data.last().unwrap().date_time;
        assert!(before <= last && last <= after);
    }

    #[tokio::test]
    async fn prediction_failure_is_local_to_its_slice() {
        let (dash, _) = dashboard(Failures {
            predict: true,
            ..Failures::default()
        });
        let vs = dash.resolve_and_fetch_all(OSLO).await;

        assert_eq!(vs.prediction, PredictionSlice::Unavailable);
        assert_eq!(vs.phase, Phase::Ready);
        assert!(vs.current.ready().is_some());
    }

    #[tokio::test]
    async fn one_failed_lookup_leaves_the_others_populated() {
        let (dash, _) = dashboard(Failures {
            sun: true,
            ..Failures::default()
        });
        let vs = dash.resolve_and_fetch_all(OSLO).await;
        assert!(vs.sun.is_failed());
        assert_eq!(vs.sun_times(), SunTimes::default());
        assert!(vs.place.ready().is_some());
        assert!(vs.forecast.ready().is_some());

        let (dash, _) = dashboard(Failures {
            place: true,
            ..Failures::default()
        });
        let vs = dash.resolve_and_fetch_all(OSLO).await;
        assert_eq!(vs.place_label(), LOCATION_UNAVAILABLE);
        assert!(vs.sun.ready().is_some());
        assert!(vs.forecast.ready().is_some());

        let (dash, _) = dashboard(Failures {
            forecast: true,
            ..Failures::default()
        });
        let vs = dash.resolve_and_fetch_all(OSLO).await;
        assert!(vs.forecast.is_failed());
        assert!(vs.place.ready().is_some());
        assert!(vs.sun.ready().is_some());
    }

    #[tokio::test]
    async fn blank_search_is_a_no_op() {
        let geocoder = FakeGeocoder::default();
        let (dash, _) = dashboard_with(geocoder, Failures::default(), ConfiguredGeolocator::new(None, true));
        let before = dash.snapshot();

        assert!(dash.search_by_text("").await.is_none());
        assert!(dash.search_by_text("   ").await.is_none());
        assert_eq!(dash.snapshot(), before);
    }

    #[tokio::test]
    async fn search_without_match_only_sets_error() {
        let (dash, _) = dashboard(Failures::default());
        let loaded = dash.resolve_and_fetch_all(OSLO).await;

        let vs = dash.search_by_text("Nowhereville9999").await.unwrap();
        assert_eq!(vs.error.as_deref(), Some(LOCATION_NOT_FOUND));
        assert_eq!(vs.current, loaded.current);
        assert_eq!(vs.forecast, loaded.forecast);
        assert_eq!(vs.generation, loaded.generation);
    }

    #[tokio::test]
    async fn search_loads_first_match() {
        let geocoder = FakeGeocoder {
            matches: vec![
                GeocodeMatch {
                    coordinate: LIMA,
                    display_name: "Lima, Peru".into(),
                },
                GeocodeMatch {
                    coordinate: OSLO,
                    display_name: "Lima, Ohio".into(),
                },
            ],
            ..FakeGeocoder::default()
        };
        let (dash, _) = dashboard_with(geocoder, Failures::default(), ConfiguredGeolocator::new(None, true));

        let vs = dash.search_by_text("  Lima ").await.unwrap();
        assert_eq!(vs.coordinate, Some(LIMA));
        assert_eq!(vs.place_label(), "Place -12");
        assert!(vs.error.is_none());
    }

    #[tokio::test]
    async fn map_selection_closes_picker_even_on_failure() {
        let (dash, _) = dashboard(Failures {
            place: true,
            current: true,
            sun: true,
            forecast: true,
            predict: true,
        });
        dash.open_map_picker();
        assert!(dash.snapshot().map_picker_open);

        let vs = dash.select_from_map(LIMA).await;
        assert!(!vs.map_picker_open);
        assert!(!vs.loading);
        assert_eq!(vs.phase, Phase::Errored);
        assert_eq!(vs.place_label(), LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn denied_geolocation_uses_fallback() {
        let (dash, _) = dashboard_with(
            FakeGeocoder::default(),
            Failures::default(),
            ConfiguredGeolocator::new(Some(OSLO), false),
        );
        let vs = dash.locate_and_fetch().await;
        assert_eq!(vs.coordinate, Some(LIMA));

        let (dash, _) = dashboard(Failures::default());
        let vs = dash.locate_and_fetch().await;
        assert_eq!(vs.coordinate, Some(OSLO));
    }

    #[tokio::test]
    async fn stale_cycle_cannot_overwrite_newer_one() {
        let geocoder = FakeGeocoder {
            slow: Some(OSLO),
            ..FakeGeocoder::default()
        };
        let started = geocoder.started.clone();
        let gate = geocoder.gate.clone();
        let (dash, _) = dashboard_with(geocoder, Failures::default(), ConfiguredGeolocator::new(None, true));

        let (stale, fresh) = tokio::join!(dash.resolve_and_fetch_all(OSLO), async {
            started.notified().await;
            let vs = dash.resolve_and_fetch_all(LIMA).await;
            gate.notify_one();
            vs
        });

        assert_eq!(fresh.generation, 2);
        assert_eq!(fresh.place_label(), "Place -12");
        assert_eq!(stale.generation, 2);

        let vs = dash.snapshot();
        assert_eq!(vs.coordinate, Some(LIMA));
        assert_eq!(vs.place_label(), "Place -12");
        assert!(!vs.loading);
    }

    #[tokio::test]
    async fn late_search_match_cannot_override_newer_map_pick() {
        let geocoder = FakeGeocoder {
            matches: vec![GeocodeMatch {
                coordinate: OSLO,
                display_name: "Oslo, Norway".into(),
            }],
            slow_search: true,
            ..FakeGeocoder::default()
        };
        let started = geocoder.started.clone();
        let gate = geocoder.gate.clone();
        let (dash, _) = dashboard_with(geocoder, Failures::default(), ConfiguredGeolocator::new(None, true));

        let (searched, picked) = tokio::join!(dash.search_by_text("Oslo"), async {
            started.notified().await;
            let vs = dash.select_from_map(LIMA).await;
            gate.notify_one();
            vs
        });

        assert_eq!(picked.coordinate, Some(LIMA));
        assert_eq!(searched.unwrap().coordinate, Some(LIMA));

        let vs = dash.snapshot();
        assert_eq!(vs.generation, 1);
        assert_eq!(vs.coordinate, Some(LIMA));
        assert_eq!(vs.place_label(), "Place -12");
        assert!(!vs.loading);
    }

    #[tokio::test]
    async fn late_search_miss_leaves_newer_cycle_alone() {
        let geocoder = FakeGeocoder {
            slow_search: true,
            ..FakeGeocoder::default()
        };
        let started = geocoder.started.clone();
        let gate = geocoder.gate.clone();
        let (dash, _) = dashboard_with(geocoder, Failures::default(), ConfiguredGeolocator::new(None, true));

        let (searched, _) = tokio::join!(dash.search_by_text("Nowhereville9999"), async {
            started.notified().await;
            let vs = dash.resolve_and_fetch_all(LIMA).await;
            gate.notify_one();
            vs
        });

        assert!(searched.unwrap().error.is_none());
        let vs = dash.snapshot();
        assert!(vs.error.is_none());
        assert_eq!(vs.coordinate, Some(LIMA));
    }

    #[tokio::test]
    async fn observers_see_loading_then_settled() {
        let (dash, _) = dashboard(Failures::default());
        let mut rx = dash.subscribe();
        assert!(rx.borrow_and_update().initial_load);

        dash.resolve_and_fetch_all(OSLO).await;
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(!seen.loading);
        assert_eq!(seen.phase, Phase::Ready);
    }

    #[tokio::test]
    async fn full_page_spinner_only_on_first_load() {
        let (dash, _) = dashboard(Failures::default());
        dash.begin_cycle(OSLO);
        assert!(dash.snapshot().shows_full_page_spinner());

        dash.resolve_and_fetch_all(OSLO).await;
        dash.begin_cycle(LIMA);
        let vs = dash.snapshot();
        assert!(vs.loading);
        assert!(!vs.shows_full_page_spinner());
    }

    #[test]
    fn forecast_entries_are_chronological_and_capped() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let points: Vec<_> = (0..8)
            .rev()
            .map(|i| ForecastPoint {
                timestamp: start + Duration::hours(i),
                temperature_c: i as f64 + 0.6,
                condition_label: "Clouds".into(),
            })
            .collect();

        let entries = forecast_entries(points, &Utc);
        assert_eq!(entries.len(), FORECAST_ENTRIES);
        assert_eq!(entries[0].time_label, "12 AM");
        assert_eq!(entries[0].temperature_c, 1);
        assert_eq!(entries[5].time_label, "5 AM");
        assert!(entries.iter().all(|e| e.condition_icon == ConditionIcon::Clouds));
    }
}
