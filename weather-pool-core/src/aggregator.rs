//! Select-fetch-normalize over the provider pool.
//!
//! An [`Aggregator`] owns the registry, the adapter table, one HTTP client
//! and the two background tasks (quota reset sweep, breaker re-enable
//! worker). Each `fetch` makes at most one upstream attempt: success counts
//! against the provider's quota, any failure disables it.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    breaker::CircuitBreaker,
    config::{Config, Settings},
    error::FetchError,
    model::{WeatherQuery, WeatherSnapshot},
    provider::{AdapterTable, ProviderAdapter, ProviderDescriptor, ProviderKind},
    quota::QuotaTracker,
    registry::ProviderRegistry,
    selector,
};

/// Point-in-time view of one provider, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub kind: ProviderKind,
    pub usage: u64,
    pub hourly_quota: u64,
    pub enabled: bool,
}

#[derive(Debug)]
pub struct AggregatorBuilder {
    config: Config,
    registry: Option<ProviderRegistry>,
    adapters: AdapterTable,
    http: Option<Client>,
}

impl AggregatorBuilder {
    /// Uses `registry` instead of building one from the config.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Adds or replaces the adapter for `adapter.kind()`.
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.register(adapter);
        self
    }

    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Builds the aggregator and spawns its background tasks. Must be called
    /// inside a Tokio runtime.
    pub fn start(self) -> Result<Aggregator> {
        let settings: &Settings = &self.config.settings;
        settings.validate().context("Invalid settings")?;
        let request_timeout = settings.request_timeout();

        let http = match self.http {
            Some(http) => http,
            None => Client::builder()
                .timeout(request_timeout)
                .user_agent(settings.user_agent.as_str())
                .build()
                .context("Failed to build HTTP client")?,
        };

        let registry = Arc::new(
            self.registry
                .unwrap_or_else(|| ProviderRegistry::from_config(&self.config)),
        );

        let quota = QuotaTracker::new(registry.clone(), settings.quota_window());
        let reset_task = quota.spawn_reset_task();
        let (breaker, reenable_task) =
            CircuitBreaker::start(registry.clone(), settings.cooldown());

        Ok(Aggregator {
            registry,
            adapters: self.adapters,
            quota,
            breaker,
            http,
            request_timeout,
            default_days: settings.default_days,
            tasks: vec![reset_task, reenable_task],
        })
    }
}

#[derive(Debug)]
pub struct Aggregator {
    registry: Arc<ProviderRegistry>,
    adapters: AdapterTable,
    quota: QuotaTracker,
    breaker: CircuitBreaker,
    http: Client,
    request_timeout: Duration,
    default_days: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl Aggregator {
    pub fn builder(config: &Config) -> AggregatorBuilder {
        AggregatorBuilder {
            config: config.clone(),
            registry: None,
            adapters: AdapterTable::standard(),
            http: None,
        }
    }

    /// Shorthand for `Aggregator::builder(config).start()`.
    pub fn start(config: &Config) -> Result<Self> {
        Self::builder(config).start()
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn default_days(&self) -> usize {
        self.default_days
    }

    pub fn select_provider(&self) -> Option<Arc<ProviderDescriptor>> {
        selector::select_provider(&self.registry, &mut rand::rng())
    }

    /// Weather for `location` over `days` forecast days (configured default
    /// when `None`). `None` when no provider is eligible or the chosen one
    /// fails.
    pub async fn fetch_weather(&self, location: &str, days: Option<usize>) -> Option<WeatherSnapshot> {
        let query = WeatherQuery::new(location).with_days(days.unwrap_or(self.default_days));
        self.fetch(&query).await
    }

    pub async fn fetch(&self, query: &WeatherQuery) -> Option<WeatherSnapshot> {
        let provider = self.select_provider()?;

        match self.fetch_from(&provider, query).await {
            Ok(snapshot) => {
                self.quota.record_use(provider.name());
                debug!(provider = provider.name(), days = snapshot.weather.len(), "fetch succeeded");
                Some(snapshot)
            }
            Err(err) => {
                warn!(
                    provider = provider.name(),
                    class = err.class(),
                    error = %err,
                    "fetch failed"
                );
                self.breaker.disable(provider.name());
                None
            }
        }
    }

    async fn fetch_from(
        &self,
        provider: &ProviderDescriptor,
        query: &WeatherQuery,
    ) -> Result<WeatherSnapshot, FetchError> {
        let kind = provider.kind();
        let adapter = self.adapters.get(kind).ok_or(FetchError::NoAdapter(kind))?;

        let raw = tokio::time::timeout(self.request_timeout, adapter.fetch(&self.http, provider, query))
            .await
            .map_err(|_| FetchError::Timeout(self.request_timeout))??;

        adapter
            .normalize(&raw, query.days)
            .ok_or(FetchError::Incomplete(kind))
    }

    pub fn status(&self) -> Vec<ProviderStatus> {
        self.registry
            .iter()
            .map(|p| ProviderStatus {
                name: p.name().to_string(),
                kind: p.kind(),
                usage: p.usage(),
                hourly_quota: p.hourly_quota(),
                enabled: p.is_enabled(),
            })
            .collect()
    }

    /// Stops the background tasks.
    pub fn shutdown(mut self) {
        self.abort_tasks();
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
