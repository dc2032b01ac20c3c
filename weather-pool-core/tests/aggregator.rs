//! Dispatch through the aggregator: usage accounting, disable on failure,
//! timeouts, and one end-to-end fetch against a mock met.no.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::Instant;
use weather_pool_core::{
    Aggregator, Config, FetchError, ProviderAdapter, ProviderConfig, ProviderDescriptor,
    ProviderKind, ProviderRegistry, WeatherQuery, WeatherSnapshot, provider::metno,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone)]
enum Outcome {
    Payload(Value),
    Fail,
    Hang,
}

/// Stands in for the met.no adapter and counts how often it is called.
#[derive(Debug)]
struct Scripted {
    outcome: Outcome,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(outcome: Outcome) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Arc::new(Self { outcome, calls: calls.clone() }), calls)
    }
}

#[async_trait]
impl ProviderAdapter for Scripted {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Metno
    }

    async fn fetch(
        &self,
        _http: &Client,
        _provider: &ProviderDescriptor,
        _query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Payload(raw) => Ok(raw.clone()),
            Outcome::Fail => Err(FetchError::Status { status: 503, body: "busy".into() }),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Value::Null)
            }
        }
    }

    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot> {
        metno::normalize(raw, days)
    }
}

fn timeseries_entry(time: &str, temp: f64) -> Value {
    json!({
        "time": time,
        "data": {
            "instant": { "details": {
                "air_temperature": temp,
                "wind_speed": 10.0,
                "wind_from_direction": 90.0
            }},
            "next_1_hours": { "summary": { "symbol_code": "clearsky_day" } }
        }
    })
}

fn metno_payload() -> Value {
    json!({
        "geometry": { "coordinates": [13.41, 52.52, 40] },
        "properties": {
            "timeseries": [
                timeseries_entry("2024-06-01T12:00:00Z", 20.4),
                timeseries_entry("2024-06-01T18:00:00Z", 17.0),
                timeseries_entry("2024-06-02T12:00:00Z", 22.0),
                timeseries_entry("2024-06-03T12:00:00Z", 19.0),
                timeseries_entry("2024-06-04T12:00:00Z", 18.0)
            ]
        }
    })
}

fn single_provider(quota: u64) -> ProviderRegistry {
    ProviderRegistry::from_descriptors(vec![ProviderDescriptor::new(
        "metno",
        ProviderKind::Metno,
        "http://unused.invalid",
        None,
        quota,
        Instant::now(),
    )])
}

fn start(outcome: Outcome, quota: u64) -> (Aggregator, Arc<AtomicUsize>) {
    let (adapter, calls) = Scripted::new(outcome);
    let aggregator = Aggregator::builder(&Config::default())
        .registry(single_provider(quota))
        .adapter(adapter)
        .start()
        .expect("aggregator starts");
    (aggregator, calls)
}

#[tokio::test]
async fn test_settings_reach_components() {
    let mut config = Config::default();
    config.settings.cooldown_secs = 60;
    config.settings.quota_window_secs = 120;
    config.settings.default_days = 5;

    let agg = Aggregator::builder(&config)
        .registry(single_provider(1))
        .start()
        .expect("aggregator starts");

    assert_eq!(agg.breaker().cooldown(), Duration::from_secs(60));
    assert_eq!(agg.quota().window(), Duration::from_secs(120));
    assert_eq!(agg.default_days(), 5);
}

#[tokio::test]
async fn test_unusable_settings_fail_start() {
    let mut config = Config::default();
    config.settings.quota_window_secs = 0;

    let err = Aggregator::builder(&config)
        .registry(single_provider(1))
        .start()
        .unwrap_err();
    assert!(format!("{err:#}").contains("quota_window_secs"));

    let mut config = Config::default();
    config.settings.request_timeout_secs = 0;
    assert!(Aggregator::start(&config).is_err());
}

#[tokio::test]
async fn test_success_records_one_use() {
    let (agg, calls) = start(Outcome::Payload(metno_payload()), 10);

    let snap = agg.fetch_weather("52.52,13.41", None).await.expect("snapshot");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(snap.weather.len(), 3);
    let status = agg.status();
    assert_eq!(status[0].usage, 1);
    assert!(status[0].enabled);
    agg.shutdown();
}

#[tokio::test]
async fn test_normalized_output_fields() {
    let (agg, _) = start(Outcome::Payload(metno_payload()), 10);

    let snap = agg.fetch_weather("52.52,13.41", Some(1)).await.expect("snapshot");
    let cc = snap.current().expect("current");

    assert_eq!(cc.temp_c, "20");
    assert_eq!(cc.windspeed_kmph, "36");
    assert_eq!(cc.winddir_16_point, "E");
    assert_eq!(snap.weather.len(), 1);
    assert_eq!(snap.request[0].query, "52.52,13.41");

    let envelope = snap.to_envelope().expect("serializable");
    assert_eq!(envelope["data"]["current_condition"][0]["temp_C"], "20");
    assert_eq!(envelope["data"]["current_condition"][0]["winddir16Point"], "E");
}

#[tokio::test]
async fn test_failure_disables_and_returns_none() {
    let (agg, calls) = start(Outcome::Fail, 10);

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let status = agg.status();
    assert!(!status[0].enabled);
    assert_eq!(status[0].usage, 0);

    // Nothing left to pick from; the adapter is not called again.
    assert!(agg.select_provider().is_none());
    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_incomplete_payload_counts_as_failure() {
    let (agg, _) = start(Outcome::Payload(json!({ "properties": { "timeseries": [] } })), 10);

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());
    assert!(!agg.status()[0].enabled);
}

#[tokio::test]
async fn test_exhausted_quota_skips_provider() {
    let (agg, calls) = start(Outcome::Payload(metno_payload()), 1);

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_some());
    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let status = agg.status();
    assert_eq!(status[0].usage, 1);
    assert!(status[0].enabled, "quota exhaustion is not a failure");
}

#[tokio::test(start_paused = true)]
async fn test_quota_resets_after_window() {
    let (agg, _) = start(Outcome::Payload(metno_payload()), 1);

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_some());
    assert!(agg.select_provider().is_none());

    tokio::time::advance(Duration::from_secs(3600)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    assert_eq!(agg.status()[0].usage, 0);
    assert!(agg.select_provider().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_upstream_times_out() {
    let mut config = Config::default();
    config.settings.request_timeout_secs = 2;

    let (adapter, _) = Scripted::new(Outcome::Hang);
    let agg = Aggregator::builder(&config)
        .registry(single_provider(10))
        .adapter(adapter)
        .start()
        .expect("aggregator starts");

    let started = Instant::now();
    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert!(!agg.status()[0].enabled);
}

#[tokio::test(start_paused = true)]
async fn test_provider_returns_after_cooldown() {
    let (agg, _) = start(Outcome::Fail, 10);

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_none());

    tokio::time::advance(Duration::from_secs(299)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(agg.select_provider().is_none());

    tokio::time::advance(Duration::from_secs(1)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(agg.select_provider().is_some());
}

#[tokio::test]
async fn test_end_to_end_against_mock_metno() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weatherapi/locationforecast/2.0/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metno_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.providers.insert(
        "metno".to_string(),
        ProviderConfig { base_url: Some(server.uri()), ..Default::default() },
    );

    let agg = Aggregator::start(&config).expect("aggregator starts");
    assert_eq!(agg.registry().names(), vec!["metno"]);

    let snap = agg.fetch_weather("52.52,13.41", Some(2)).await.expect("snapshot");
    assert_eq!(snap.weather.len(), 2);
    assert_eq!(snap.weather[0].date, "2024-06-01");
    assert_eq!(snap.weather[0].maxtemp_c, "20");
    assert_eq!(snap.weather[0].mintemp_c, "17");
    assert_eq!(snap.weather[0].hourly.len(), 2);
    assert_eq!(agg.status()[0].usage, 1);
}

#[tokio::test]
async fn test_supplied_http_client_is_used() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weatherapi/locationforecast/2.0/complete"))
        .and(header("user-agent", "pool-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metno_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.providers.insert(
        "metno".to_string(),
        ProviderConfig { base_url: Some(server.uri()), ..Default::default() },
    );
    let http = Client::builder().user_agent("pool-test/1.0").build().expect("client");

    let agg = Aggregator::builder(&config)
        .http_client(http)
        .start()
        .expect("aggregator starts");

    assert!(agg.fetch_weather("52.52,13.41", None).await.is_some());
}
