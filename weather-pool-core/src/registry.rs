use std::sync::Arc;

use tokio::time::Instant;

use crate::{
    config::Config,
    provider::{ProviderDescriptor, ProviderKind},
};

/// The fixed set of configured upstreams.
///
/// Membership never changes after construction; only each descriptor's
/// quota window and breaker state do.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderDescriptor>>,
}

impl ProviderRegistry {
    /// Builds the registry from configuration. met.no is always present;
    /// every other provider is included only when its credential is set.
    pub fn from_config(config: &Config) -> Self {
        let now = Instant::now();
        let mut providers = Vec::new();

        for kind in ProviderKind::all() {
            let overrides = config.provider_config(*kind);
            let api_key = config.provider_api_key(*kind).map(str::to_string);

            if !config.is_provider_configured(*kind) {
                tracing::debug!(provider = %kind, "no credential, provider not registered");
                continue;
            }

            let base_url = overrides
                .and_then(|o| o.base_url.clone())
                .unwrap_or_else(|| kind.default_base_url().to_string());
            let quota = overrides
                .and_then(|o| o.hourly_quota)
                .unwrap_or_else(|| kind.default_hourly_quota());

            providers.push(ProviderDescriptor::new(kind.as_str(), *kind, base_url, api_key, quota, now));
        }

        let registry = Self::from_descriptors(providers);
        tracing::info!(providers = ?registry.names(), "provider registry built");
        registry
    }

    /// Builds a registry from explicit descriptors. Later duplicates of a
    /// name are dropped.
    pub fn from_descriptors(descriptors: Vec<ProviderDescriptor>) -> Self {
        let mut providers: Vec<Arc<ProviderDescriptor>> = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            if providers.iter().any(|p| p.name() == d.name()) {
                tracing::warn!(provider = d.name(), "duplicate provider name ignored");
                continue;
            }
            providers.push(Arc::new(d));
        }
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ProviderDescriptor>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderDescriptor>> {
        self.providers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
