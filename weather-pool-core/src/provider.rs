use crate::{
    breaker::BreakerState,
    error::FetchError,
    model::{WeatherQuery, WeatherSnapshot},
    provider::{
        accuweather::AccuWeatherAdapter, metno::MetnoAdapter,
        openweathermap::OpenWeatherMapAdapter, weatherapi::WeatherApiAdapter,
    },
    quota::QuotaWindow,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::{collections::HashMap, convert::TryFrom, fmt::Debug, sync::Arc};
use tokio::time::Instant;

pub mod accuweather;
pub mod metno;
pub mod openweathermap;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Metno,
    OpenWeatherMap,
    WeatherApi,
    AccuWeather,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Metno => "metno",
            ProviderKind::OpenWeatherMap => "openweathermap",
            ProviderKind::WeatherApi => "weatherapi",
            ProviderKind::AccuWeather => "accuweather",
        }
    }

    pub const fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Metno,
            ProviderKind::OpenWeatherMap,
            ProviderKind::WeatherApi,
            ProviderKind::AccuWeather,
        ]
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Metno => "https://api.met.no",
            ProviderKind::OpenWeatherMap => "https://api.openweathermap.org/data/2.5",
            ProviderKind::WeatherApi => "https://api.weatherapi.com/v1",
            ProviderKind::AccuWeather => "https://dataservice.accuweather.com",
        }
    }

    /// Requests per hour granted on the provider's free tier.
    pub fn default_hourly_quota(&self) -> u64 {
        match self {
            ProviderKind::Metno => 5_000,
            ProviderKind::OpenWeatherMap => 1_000,
            ProviderKind::WeatherApi => 1_000_000,
            ProviderKind::AccuWeather => 50,
        }
    }

    /// Credential lookup key. `None` for providers that need no credential.
    pub fn credential_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Metno => None,
            ProviderKind::OpenWeatherMap => Some("OPENWEATHERMAP_API_KEY"),
            ProviderKind::WeatherApi => Some("WEATHERAPI_KEY"),
            ProviderKind::AccuWeather => Some("ACCUWEATHER_API_KEY"),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "metno" => Ok(ProviderKind::Metno),
            "openweathermap" => Ok(ProviderKind::OpenWeatherMap),
            "weatherapi" => Ok(ProviderKind::WeatherApi),
            "accuweather" => Ok(ProviderKind::AccuWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: metno, openweathermap, weatherapi, accuweather."
            )),
        }
    }
}

/// One configured upstream. Identity fields are fixed at startup; the quota
/// window and breaker state are mutated for the life of the process.
#[derive(Debug)]
pub struct ProviderDescriptor {
    name: String,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    pub(crate) quota: QuotaWindow,
    pub(crate) breaker: BreakerState,
}

impl ProviderDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        base_url: impl Into<String>,
        api_key: Option<String>,
        hourly_quota: u64,
        now: Instant,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            quota: QuotaWindow::new(hourly_quota, now),
            breaker: BreakerState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub(crate) fn require_api_key(&self) -> Result<&str, FetchError> {
        self.api_key().ok_or(FetchError::MissingCredential)
    }

    pub fn hourly_quota(&self) -> u64 {
        self.quota.limit()
    }

    pub fn usage(&self) -> u64 {
        self.quota.usage()
    }

    pub fn is_enabled(&self) -> bool {
        self.breaker.is_enabled()
    }

    /// Enabled and under quota.
    pub fn is_eligible(&self) -> bool {
        self.is_enabled() && self.quota.is_under_quota()
    }
}

/// Fetch-and-normalize pair for one provider kind.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    fn kind(&self) -> ProviderKind;

    /// Performs the outbound request(s) and returns the raw JSON payload.
    async fn fetch(
        &self,
        http: &Client,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError>;

    /// Maps the raw payload into the canonical schema, keeping at most `days`
    /// forecast days. `None` when a required top-level field is missing.
    fn normalize(&self, raw: &Value, days: usize) -> Option<WeatherSnapshot>;
}

/// Provider kind -> adapter lookup used by dispatch.
#[derive(Debug, Clone, Default)]
pub struct AdapterTable {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterTable {
    /// Table with the built-in adapter for every known kind.
    pub fn standard() -> Self {
        let mut table = Self::default();
        table.register(Arc::new(MetnoAdapter));
        table.register(Arc::new(OpenWeatherMapAdapter));
        table.register(Arc::new(WeatherApiAdapter));
        table.register(Arc::new(AccuWeatherAdapter));
        table
    }

    /// Adds or replaces the adapter for its kind.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind)
    }
}

/// Sends `request` and decodes a JSON body, treating non-2xx and empty bodies as failures.
pub(crate) async fn get_json(request: RequestBuilder) -> Result<Value, FetchError> {
    let res = request.send().await?;

    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(&body) });
    }
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }

    Ok(serde_json::from_str(&body)?)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_as_str_roundtrip() {
        for kind in ProviderKind::all() {
            let s = kind.as_str();
            let parsed = ProviderKind::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderKind::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn only_the_baseline_needs_no_credential() {
        let keyless: Vec<_> =
            ProviderKind::all().iter().filter(|k| k.credential_key().is_none()).collect();
        assert_eq!(keyless, vec![&ProviderKind::Metno]);
    }

    #[test]
    fn standard_table_covers_every_kind() {
        let table = AdapterTable::standard();
        for kind in ProviderKind::all() {
            let adapter = table.get(*kind).expect("adapter registered");
            assert_eq!(adapter.kind(), *kind);
        }
    }

    #[test]
    fn descriptor_trims_trailing_slash_and_starts_eligible() {
        let p = ProviderDescriptor::new(
            "metno",
            ProviderKind::Metno,
            "http://localhost:1234/",
            None,
            2,
            Instant::now(),
        );
        assert_eq!(p.base_url(), "http://localhost:1234");
        assert!(p.is_enabled());
        assert!(p.is_eligible());
        assert_eq!(p.usage(), 0);
        assert!(matches!(p.require_api_key(), Err(FetchError::MissingCredential)));
    }

    #[test]
    fn truncate_body_is_char_safe() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
